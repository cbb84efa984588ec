use crate::state::{FrameStats, ViewerState};
use egui::Context as EguiContext;
use glam::Vec3;
use meshview_common::DrawProperties;
use meshview_kernel::TimeSource;
use meshview_render::{Camera, CapabilityTier};

/// Side panel editing the draw properties.
pub struct SettingsPanel {
    model_names: Vec<String>,
    tier: CapabilityTier,
    pub visible: bool,
}

impl SettingsPanel {
    pub fn new(model_names: Vec<String>, tier: CapabilityTier) -> Self {
        Self {
            model_names,
            tier,
            visible: true,
        }
    }

    pub fn show<C: TimeSource>(&self, ctx: &EguiContext, state: &mut ViewerState<C>) {
        if !self.visible {
            return;
        }
        let ViewerState {
            camera,
            props,
            stats,
            ..
        } = state;

        egui::SidePanel::left("settings")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("meshview");
                ui.label(format!("{}", self.tier));
                ui.separator();

                self.model_section(ui, props);
                ui.separator();
                self.shading_section(ui, props);
                ui.separator();
                transform_section(ui, props);
                ui.separator();
                info_section(ui, camera, stats);
            });
    }

    fn model_section(&self, ui: &mut egui::Ui, props: &mut DrawProperties) {
        ui.heading("Model");
        let mut selected = props.selected_model_index;
        let current = self
            .model_names
            .get(selected)
            .map(String::as_str)
            .unwrap_or("none");
        egui::ComboBox::from_label("Mesh")
            .selected_text(current)
            .show_ui(ui, |ui| {
                for (index, name) in self.model_names.iter().enumerate() {
                    ui.selectable_value(&mut selected, index, name);
                }
            });
        if props.select_model(selected, self.model_names.len()) {
            tracing::info!(model = %self.model_names[selected], "model selected");
        }

        color_row(ui, "Color", &mut props.model_color);
        color_row(ui, "Background", &mut props.background_color);
    }

    fn shading_section(&self, ui: &mut egui::Ui, props: &mut DrawProperties) {
        ui.heading("Shading");
        ui.checkbox(&mut props.diffuse_enabled, "Diffuse");
        ui.checkbox(&mut props.specular_enabled, "Specular");
        ui.add_enabled(
            self.tier.supports_polygon_mode(),
            egui::Checkbox::new(&mut props.wireframe_mode_enabled, "Wireframe"),
        );
        ui.checkbox(&mut props.skybox_enabled, "Skybox");
        ui.label("Light direction");
        vec3_row(ui, &mut props.light_direction, 0.01, -1.0..=1.0, "");
    }
}

fn transform_section(ui: &mut egui::Ui, props: &mut DrawProperties) {
    ui.heading("View");
    ui.horizontal(|ui| {
        ui.label("FOV");
        ui.add(
            egui::DragValue::new(&mut props.fov)
                .speed(0.5)
                .range(1.0..=179.0)
                .suffix("°"),
        );
    });
    ui.label("Rotation");
    vec3_row(ui, &mut props.model_rotation, 1.0, -360.0..=360.0, "°");
    if ui.button("Reset rotation").clicked() {
        props.model_rotation = Vec3::ZERO;
    }
}

fn info_section(ui: &mut egui::Ui, camera: &Camera, stats: &FrameStats) {
    ui.heading("Info");
    let position = camera.position();
    ui.label(format!(
        "Camera: ({:.2}, {:.2}, {:.2})",
        position.x, position.y, position.z
    ));
    ui.label(format!(
        "Yaw {:.1}°  Pitch {:.1}°",
        camera.yaw(),
        camera.pitch()
    ));
    ui.label(format!(
        "{:.0} fps ({:.2} ms), {} steps",
        stats.fps(),
        stats.smoothed_ms(),
        stats.steps_last_frame()
    ));
    ui.separator();
    ui.label("WASD move, Space/Shift up/down");
    ui.label("Hold right mouse to look, F1 hides this panel");
}

fn color_row(ui: &mut egui::Ui, label: &str, color: &mut Vec3) {
    ui.horizontal(|ui| {
        let mut rgb = color.to_array();
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *color = Vec3::from_array(rgb);
        }
        ui.label(label);
    });
}

fn vec3_row(
    ui: &mut egui::Ui,
    value: &mut Vec3,
    speed: f64,
    range: std::ops::RangeInclusive<f32>,
    suffix: &str,
) {
    ui.horizontal(|ui| {
        for (axis, component) in ["x", "y", "z"].into_iter().zip(value.as_mut()) {
            ui.label(axis);
            ui.add(
                egui::DragValue::new(component)
                    .speed(speed)
                    .range(range.clone())
                    .suffix(suffix),
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_common::ViewerConfig;
    use meshview_kernel::ManualClock;

    fn run_panel(panel: &SettingsPanel, state: &mut ViewerState<&ManualClock>) {
        let ctx = EguiContext::default();
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| panel.show(ctx, state));
        }
    }

    #[test]
    fn idle_panel_leaves_properties_untouched() {
        let clock = ManualClock::new();
        let mut state = ViewerState::with_clock(&ViewerConfig::default(), &clock);
        let before = state.props;
        let panel = SettingsPanel::new(
            vec!["cube".into(), "sphere".into(), "torus".into()],
            CapabilityTier::Gl43Core,
        );
        run_panel(&panel, &mut state);
        assert_eq!(state.props, before);
    }

    #[test]
    fn out_of_range_selection_is_shown_as_none() {
        let clock = ManualClock::new();
        let mut state = ViewerState::with_clock(&ViewerConfig::default(), &clock);
        state.props.selected_model_index = 5;
        let panel = SettingsPanel::new(Vec::new(), CapabilityTier::Gles30);
        run_panel(&panel, &mut state);
        assert_eq!(state.props.selected_model_index, 5);
    }

    #[test]
    fn hidden_panel_draws_nothing() {
        let clock = ManualClock::new();
        let mut state = ViewerState::with_clock(&ViewerConfig::default(), &clock);
        let mut panel = SettingsPanel::new(vec!["cube".into()], CapabilityTier::Gl43Core);
        panel.visible = false;
        let ctx = EguiContext::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| panel.show(ctx, &mut state));
        assert!(output.shapes.is_empty());
    }
}
