use crate::device::GraphicsApi;
use crate::model::Model;
use crate::resource::ResourceError;
use crate::skybox::{Skybox, SkyboxBuilder};
use meshview_common::AssetConfig;
use std::rc::Rc;

/// Everything the viewer can draw: an ordered model list and an optional
/// skybox. Models are selected by index.
pub struct Scene<A: GraphicsApi> {
    models: Vec<Model<A>>,
    skybox: Option<Skybox<A>>,
}

impl<A: GraphicsApi> Scene<A> {
    pub fn new(models: Vec<Model<A>>, skybox: Option<Skybox<A>>) -> Self {
        Self { models, skybox }
    }

    /// Load every configured model and the skybox. Fails on the first
    /// resource that cannot be built.
    pub fn load(api: &Rc<A>, assets: &AssetConfig) -> Result<Self, ResourceError> {
        let models = assets
            .models
            .iter()
            .map(|path| Model::load(api, assets.resolve(path)))
            .collect::<Result<Vec<_>, _>>()?;
        let skybox = SkyboxBuilder::from_config(assets)
            .map(|builder| builder.build(api))
            .transpose()?;
        tracing::info!(
            models = models.len(),
            skybox = skybox.is_some(),
            "scene loaded"
        );
        Ok(Self { models, skybox })
    }

    pub fn models(&self) -> &[Model<A>] {
        &self.models
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(Model::name)
    }

    pub fn skybox(&self) -> Option<&Skybox<A>> {
        self.skybox.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessApi;
    use meshview_assets::MeshData;
    use std::io::Write;

    #[test]
    fn load_reads_models_in_order_without_skybox() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
            ("quad.obj", "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n"),
        ] {
            let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
            file.write_all(body.as_bytes()).unwrap();
        }
        let assets = AssetConfig {
            root: dir.path().to_path_buf(),
            models: vec!["tri.obj".into(), "quad.obj".into()],
            skybox: None,
        };

        let api = Rc::new(HeadlessApi::new());
        let scene = Scene::load(&api, &assets).unwrap();
        assert_eq!(scene.model_names().collect::<Vec<_>>(), vec!["tri", "quad"]);
        assert_eq!(scene.models()[1].index_count(), 6);
        assert!(scene.skybox().is_none());
    }

    #[test]
    fn missing_model_fails_and_releases_loaded_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        let assets = AssetConfig {
            root: dir.path().to_path_buf(),
            models: vec!["tri.obj".into(), "missing.obj".into()],
            skybox: None,
        };
        let api = Rc::new(HeadlessApi::new());
        assert!(Scene::load(&api, &assets).is_err());
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn shipped_assets_load_with_default_config() {
        let assets = AssetConfig {
            root: std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets"),
            ..AssetConfig::default()
        };
        let api = Rc::new(HeadlessApi::new());
        let scene = Scene::load(&api, &assets).unwrap();
        assert_eq!(
            scene.model_names().collect::<Vec<_>>(),
            vec!["cube", "sphere", "torus"]
        );
        assert!(scene.models().iter().all(|model| model.index_count() > 0));
        assert!(scene.skybox().is_some());
    }

    #[test]
    fn new_keeps_models() {
        let api = Rc::new(HeadlessApi::new());
        let cube = Model::from_mesh(&api, &MeshData::unit_cube()).unwrap();
        let scene = Scene::new(vec![cube], None);
        assert_eq!(scene.model_count(), 1);
        assert_eq!(scene.models()[0].name(), "unit_cube");
    }
}
