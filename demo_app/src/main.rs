//! Headless deferred-rendering demo
//!
//! Builds a small scene (ground plane, a ring of cubes, sun plus point
//! lights), runs a few frames through the full pass sequence on the
//! headless device, and logs what the pipeline did. Doubles as an
//! end-to-end smoke test of the public API; a windowed application would
//! swap the device for an OpenGL-backed one and present the main target.

use ember_engine::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ember_engine::foundation::logging::init();

    let config = RendererConfig::default()
        .with_dimensions(1280, 720)
        .with_clear_color([0.1, 0.1, 0.1, 1.0]);
    let mut renderer = Renderer::new(Box::new(HeadlessDevice::new()), &config)?;

    // Scene geometry
    let plane = renderer.create_mesh(&Mesh::plane(10.0));
    let cube = renderer.create_mesh(&Mesh::cube());

    let ground = renderer.create_textured_material();
    if let Some(material) = renderer.material_mut(ground) {
        material.set_shader_vector3("albedoColor", Vec3::new(0.6, 0.6, 0.65));
        material.set_shader_float("specularStrength", 0.1);
    }

    let crate_material = renderer.create_textured_material();
    if let Some(material) = renderer.material_mut(crate_material) {
        material.set_shader_vector3("albedoColor", Vec3::new(0.8, 0.5, 0.2));
    }

    // Lights
    renderer.add_directional_light(DirectionalLight::new(Vec3::new(-0.2, -1.0, -0.3)));
    renderer.add_point_light(
        PointLight::new(Vec3::new(0.7, 0.2, 2.0))
            .with_diffuse_intensity(Vec3::new(1.0, 0.6, 0.3)),
    );
    renderer.add_point_light(PointLight::new(Vec3::new(-4.0, 2.0, -3.0)));

    renderer.set_scene_camera(Camera::perspective(
        Vec3::new(0.0, 3.0, 8.0),
        45.0,
        1280.0 / 720.0,
        0.2,
        100.0,
    ));

    for frame in 0..3 {
        renderer.push_to_render_queue(plane, ground, Mat4::identity());
        for index in 0..6 {
            let angle = std::f32::consts::TAU * index as f32 / 6.0 + frame as f32 * 0.1;
            let transform = Transform::from_position(Vec3::new(
                angle.cos() * 4.0,
                0.5,
                angle.sin() * 4.0,
            ));
            renderer.push_to_render_queue(cube, crate_material, transform.to_matrix());
        }

        renderer.render_all_queue_items();
        log::info!("frame {frame} complete");
    }

    let sun = &renderer.directional_lights()[0];
    log::info!(
        "sun shadow map assigned: {}, main target {}x{}",
        sun.shadow_map.is_some(),
        renderer.main_render_target().width(),
        renderer.main_render_target().height(),
    );

    Ok(())
}
