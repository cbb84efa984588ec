//! Shading-mode selection for the model program.
//!
//! The GL 4.3 tier picks lighting terms through fragment-stage subroutines;
//! the GLES 3.0 tier has no subroutines and branches on uniform flags.

use crate::device::{GraphicsApi, ShaderStage};
use crate::shader::ShaderProgram;
use crate::tier::CapabilityTier;
use meshview_common::ShadingMode;
use std::collections::HashSet;

pub const DIFFUSE_ENABLED: &str = "DiffuseEnabled";
pub const SPECULAR_ENABLED: &str = "SpecularEnabled";
pub const DISABLED: &str = "Disabled";

pub const DIFFUSE_FLAG_UNIFORM: &str = "u_adsProps.diffuseEnabled";
pub const SPECULAR_FLAG_UNIFORM: &str = "u_adsProps.specularEnabled";

/// Applies a [`ShadingMode`] to the model program, which must be in use.
pub trait ShadingModeSelector<A: GraphicsApi> {
    fn apply(&mut self, program: &mut ShaderProgram<A>, mode: ShadingMode);

    fn name(&self) -> &'static str;
}

/// Subroutine names for the (diffuse, specular) slots, in slot order.
pub fn subroutine_names(mode: ShadingMode) -> [&'static str; 2] {
    [
        if mode.diffuse { DIFFUSE_ENABLED } else { DISABLED },
        if mode.specular { SPECULAR_ENABLED } else { DISABLED },
    ]
}

/// GL 4.3 tier. Subroutine state resets whenever a program is bound, so this
/// runs on every draw.
#[derive(Debug, Default)]
pub struct SubroutineSelector {
    reported: HashSet<String>,
}

impl<A: GraphicsApi> ShadingModeSelector<A> for SubroutineSelector {
    fn apply(&mut self, program: &mut ShaderProgram<A>, mode: ShadingMode) {
        if let Err(err) = program.select_subroutines(ShaderStage::Fragment, &subroutine_names(mode))
        {
            let message = err.to_string();
            if self.reported.insert(message.clone()) {
                tracing::warn!(error = %message, "failed to select shading subroutines");
            }
        }
    }

    fn name(&self) -> &'static str {
        "subroutines"
    }
}

/// GLES 3.0 tier.
#[derive(Debug, Default)]
pub struct UniformFlagSelector;

impl<A: GraphicsApi> ShadingModeSelector<A> for UniformFlagSelector {
    fn apply(&mut self, program: &mut ShaderProgram<A>, mode: ShadingMode) {
        program.set_uniform(DIFFUSE_FLAG_UNIFORM, mode.diffuse);
        program.set_uniform(SPECULAR_FLAG_UNIFORM, mode.specular);
    }

    fn name(&self) -> &'static str {
        "uniform flags"
    }
}

pub fn selector_for_tier<A: GraphicsApi>(tier: CapabilityTier) -> Box<dyn ShadingModeSelector<A>> {
    if tier.supports_subroutines() {
        Box::new(SubroutineSelector::default())
    } else {
        Box::new(UniformFlagSelector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessApi, UniformValue};
    use std::rc::Rc;

    #[test]
    fn names_follow_mode() {
        let both = ShadingMode { diffuse: true, specular: true };
        let none = ShadingMode { diffuse: false, specular: false };
        assert_eq!(subroutine_names(both), [DIFFUSE_ENABLED, SPECULAR_ENABLED]);
        assert_eq!(subroutine_names(none), [DISABLED, DISABLED]);
    }

    #[test]
    fn uniform_flags_reach_gles_program() {
        let api = Rc::new(HeadlessApi::new());
        let mut program = ShaderProgram::compile_and_link(
            &api,
            include_str!("../../../assets/shaders/model_gles3.vert.glsl"),
            include_str!("../../../assets/shaders/model_gles3.frag.glsl"),
        )
        .unwrap();
        program.use_program();

        let mut selector = selector_for_tier::<HeadlessApi>(CapabilityTier::Gles30);
        assert_eq!(selector.name(), "uniform flags");
        selector.apply(&mut program, ShadingMode { diffuse: false, specular: true });

        assert_eq!(
            api.uniform(program.handle(), DIFFUSE_FLAG_UNIFORM),
            Some(UniformValue::Int(0))
        );
        assert_eq!(
            api.uniform(program.handle(), SPECULAR_FLAG_UNIFORM),
            Some(UniformValue::Int(1))
        );
    }

    #[test]
    fn subroutine_failure_is_swallowed() {
        let api = Rc::new(HeadlessApi::new());
        // GLES program has no subroutine uniforms, so selection fails.
        let mut program = ShaderProgram::compile_and_link(
            &api,
            include_str!("../../../assets/shaders/model_gles3.vert.glsl"),
            include_str!("../../../assets/shaders/model_gles3.frag.glsl"),
        )
        .unwrap();
        program.use_program();
        let mut selector = SubroutineSelector::default();
        selector.apply(&mut program, ShadingMode::default());
        selector.apply(&mut program, ShadingMode::default());
        assert_eq!(selector.reported.len(), 1);
    }
}
