//! Windowed smoke test: brings up the full viewer against missing assets and
//! asserts that the post chain still presents the clear colour. Needs a GPU
//! adapter and a display, so it only runs with `--features integration-tests`.

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour_through_the_effect_chain() {
    use vitrine::app::{self, ImageTestResult, RenderValidator};
    use vitrine::loader::AssetSources;
    use vitrine::scene::LoadStage;

    // Point every source at nothing: the pipeline logs its failure and the
    // scene stays empty, which is exactly the state under test.
    let sources = AssetSources {
        environment: "does-not-exist.hdr".to_string(),
        model: "does-not-exist.gltf".to_string(),
        roughness_map: "does-not-exist.jpg".to_string(),
        normal_map: "does-not-exist.jpg".to_string(),
        metalness_map: "does-not-exist.jpg".to_string(),
        emissive_map: "does-not-exist.jpg".to_string(),
    };

    let mut frame = 0u32;
    let validator: RenderValidator = Box::new(move |scene, texture| {
        frame += 1;
        if frame <= 1 {
            return Ok(ImageTestResult::Waiting);
        }

        // The environment fetch failed, so the stage machine never moved.
        assert_eq!(scene.stage, LoadStage::Unloaded);
        assert!(scene.model.is_none());

        // Modelless scene: every presented pixel is the transparent clear.
        for pixel in texture.pixels() {
            if *pixel != image::Rgba([0, 0, 0, 0]) {
                return Ok(ImageTestResult::Failed);
            }
        }
        Ok(ImageTestResult::Passed)
    });

    app::run_with_validator(sources, validator).expect("viewer failed to run");
}
