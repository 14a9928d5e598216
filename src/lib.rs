use std::path::Path;

use anyhow::Context;
use cgmath::Matrix4;

pub mod config;
pub mod primitives;
pub mod resources;
pub mod sgraph;

mod camera;
mod context;
mod model;
mod pass;
mod texture;
mod window;

use crate::{
    camera::ViewSession,
    config::Config,
    context::GraphicsContext,
    model::SceneResources,
    pass::{
        phong::{PhongConfig, PhongFrame, PhongPass},
        Pass,
    },
    sgraph::{
        raycast::{ImageBuffer, RaycastConfig, RaycastRenderer},
        visitors::{collect_lights, AnimationVisitor, RasterRenderer, TextRenderer},
        SceneNode, Scenegraph,
    },
    window::{Flow, Window, WindowEvents},
};

struct State {
    ctx: GraphicsContext,
    pass: PhongPass,
    resources: SceneResources,
    scenegraph: Scenegraph,
    session: ViewSession,
    config: Config,
}

impl State {
    // Initialize the state
    async fn new(window: &Window, scenegraph: Scenegraph, config: Config) -> anyhow::Result<Self> {
        // Initialize the graphic context
        let ctx = GraphicsContext::new(window).await?;

        // Initialize the pass
        let pass = PhongPass::new(PhongConfig::default(), &ctx.device, &ctx.config);

        // Upload meshes and textures once for the whole session
        let textures = resources::load_textures(&ctx.device, &ctx.queue, scenegraph.texture_paths());
        let white = texture::Texture::white(&ctx.device, &ctx.queue);
        let resources = SceneResources::new(&ctx.device, &scenegraph, textures, white);
        log::info!(
            "Uploaded {} meshes and {} textures",
            resources.meshes.len(),
            resources.textures.len()
        );

        let session = ViewSession::new(ctx.aspect());

        Ok(Self {
            ctx,
            pass,
            resources,
            scenegraph,
            session,
            config,
        })
    }

    // Keeps state in sync with window size when changed
    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if self.ctx.resize(new_size) {
            // Make sure to current window size to depth texture - required for calc
            self.pass.resize(&self.ctx.device, &self.ctx.config);
            self.session.camera.aspect = self.ctx.aspect();
        }
    }

    fn update(&mut self) {
        let mut animation = AnimationVisitor::new(self.session.elapsed(), self.config.spin);
        animation.animate(self.scenegraph.root_mut());
    }

    // Primary render flow
    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let view = self.session.camera.view_matrix();
        let root = self.scenegraph.root();

        let lights = collect_lights(root, view);
        self.pass
            .update_globals(&self.ctx.queue, self.session.camera.projection_matrix(), &lights);

        let mut frame = PhongFrame::new(&self.resources);
        if let Err(err) = RasterRenderer::new(&mut frame, view).draw(root) {
            log::error!("Frame skipped: {}", err);
            return Ok(());
        }
        let draws = frame.into_draws();

        self.pass.draw(
            &self.ctx.surface,
            &self.ctx.device,
            &self.ctx.queue,
            &self.resources,
            &draws,
        )?;

        if self.session.take_raycast_request() {
            let raycast = self.config.raycast_config(self.session.camera.fovy);
            if let Err(err) = raycast_to_file(root, view, raycast, &self.config.output) {
                log::error!("{:#}", err);
            }
        }
        Ok(())
    }
}

/// Raycasts `root` as seen through `view` and writes the image
pub fn raycast_to_file(
    root: &SceneNode,
    view: Matrix4<f32>,
    config: RaycastConfig,
    output: &Path,
) -> anyhow::Result<ImageBuffer> {
    let image = RaycastRenderer::new(config).render(root, view);
    image
        .save(output)
        .with_context(|| format!("Couldn't write raycast image {:?}", output))?;
    log::info!("Raycast image written to {:?}", output);
    Ok(image)
}

/// Prints the scene tree, one node per line
pub fn print_tree(config: &Config) -> anyhow::Result<()> {
    let scenegraph = resources::load_scene(&config.scene)?;
    print!("{}", TextRenderer::render(scenegraph.root()));
    Ok(())
}

/// Raycasts the scene from the initial camera without opening a window
pub fn render_headless(config: &Config, output: &Path) -> anyhow::Result<()> {
    let scenegraph = resources::load_scene(&config.scene)?;
    let session = ViewSession::new(config.width as f32 / config.height.max(1) as f32);
    let raycast = config.raycast_config(session.camera.fovy);
    raycast_to_file(scenegraph.root(), session.camera.view_matrix(), raycast, output)?;
    Ok(())
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let scenegraph = resources::load_scene(&config.scene)?;

    let window = Window::new("Scene Graphs with Lights", config.width, config.height)?;

    // State::new uses async code, so we're going to wait for it to finish
    let mut state = State::new(&window, scenegraph, config).await?;

    window.run(move |event| match event {
        WindowEvents::Resized { width, height } => {
            state.resize(winit::dpi::PhysicalSize { width, height });
            Flow::Continue
        }
        WindowEvents::Keyboard {
            state: key_state,
            virtual_keycode,
        } => {
            state.session.process_keyboard(&key_state, virtual_keycode);
            Flow::Continue
        }
        WindowEvents::MouseMoved { position } => {
            state.session.process_mouse_moved(position);
            Flow::Continue
        }
        WindowEvents::MouseInput {
            state: button_state,
            button,
        } => {
            state.session.process_mouse_input(&button_state, button);
            Flow::Continue
        }
        WindowEvents::Draw => {
            state.update();
            match state.render() {
                Ok(_) => Flow::Continue,
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    state.resize(state.ctx.size);
                    Flow::Continue
                }
                // The system is out of memory, we should probably quit
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of GPU memory");
                    Flow::Exit
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("Surface timeout");
                    Flow::Continue
                }
            }
        }
    })
}
