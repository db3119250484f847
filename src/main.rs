//! Goal Rush entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::KeyboardEvent;

    use goal_rush::platform::web;
    use goal_rush::renderer::RenderState;
    use goal_rush::{FrameDriver, FrameFlow, GameError, Session, Settings, World};

    type Driver = Rc<RefCell<FrameDriver<RenderState>>>;

    const CANVAS_ID: &str = "gameCanvas";

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {e}").into());
        }

        log::info!("Goal Rush starting...");

        match start().await {
            Ok(driver) => {
                request_frame(driver);
                log::info!("Animation loop started");
            }
            Err(e) => log::error!("Start-up aborted: {}", e),
        }
    }

    async fn start() -> Result<Driver, GameError> {
        let settings = Settings::load();
        let max_pixel_ratio = settings.graphics.quality.max_pixel_ratio();

        let canvas = web::canvas(CANVAS_ID)?;
        let (width, height) = web::fit_canvas(&canvas, max_pixel_ratio);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| GameError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GameError::Adapter(e.to_string()))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let quality = settings.graphics.quality;
        let render_state = RenderState::new(
            surface,
            &adapter,
            width,
            height,
            quality
                .shadows_enabled()
                .then(|| quality.shadow_map_size()),
        )
        .await?;

        let world = World::bootstrap(&settings, width, height);
        let session = Session::start(world, &settings)?;
        let driver = Rc::new(RefCell::new(FrameDriver::new(
            session,
            render_state,
            width,
            height,
        )));

        setup_input_handlers(driver.clone())?;
        setup_resize_handler(canvas, max_pixel_ratio, driver.clone())?;

        Ok(driver)
    }

    fn setup_input_handlers(driver: Driver) -> Result<(), GameError> {
        let window = web::window()?;

        {
            let driver = driver.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut d = driver.borrow_mut();
                if d.session.player.input.key_down(&event.key()) {
                    event.prevent_default();
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                driver.borrow_mut().session.player.input.key_up(&event.key());
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        log::info!("Keyboard listeners registered");
        Ok(())
    }

    fn setup_resize_handler(
        canvas: web_sys::HtmlCanvasElement,
        max_pixel_ratio: f64,
        driver: Driver,
    ) -> Result<(), GameError> {
        let window = web::window()?;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (width, height) = web::fit_canvas(&canvas, max_pixel_ratio);
            driver.borrow_mut().resize(width, height);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
        Ok(())
    }

    fn request_frame(driver: Driver) {
        web::request_animation_frame(move |time: f64| {
            game_loop(driver, time);
        });
    }

    fn game_loop(driver: Driver, time: f64) {
        let (flow, notice) = {
            let mut d = driver.borrow_mut();
            let flow = d.frame(time);
            (flow, d.session.take_notice())
        };

        // Driver is released here: listeners may run while the alert is open
        if let Some(message) = notice {
            web::alert(message);
        }

        match flow {
            FrameFlow::Continue => request_frame(driver),
            FrameFlow::Stop => log::info!("Animation loop stopped"),
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

/// Headless run: steer the ball into the goal and report how long it took
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec3;
    use goal_rush::consts::GOAL_CENTER;
    use goal_rush::{RunState, Session, Settings, World};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Goal Rush (native) starting...");
    log::info!("Rendering requires a browser - run with `trunk serve` for the web version");

    let settings = Settings::load();
    let world = World::bootstrap(&settings, 1280, 720);
    let mut session = match Session::start(world, &settings) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Start-up aborted: {}", e);
            std::process::exit(1);
        }
    };

    let goal = Vec3::from(GOAL_CENTER);
    let dt = settings.physics.time_step;
    let max_ticks = 60 * 120;

    for tick in 0..max_ticks {
        if let Some(pos) = session
            .world
            .physics()
            .and_then(|p| session.player.position(p))
        {
            let input = &mut session.player.input;
            input.right = pos.x < goal.x;
            input.left = pos.x > goal.x;
            input.backward = pos.z < goal.z;
            input.forward = pos.z > goal.z;
        }

        session.tick(dt);
        if let Some(message) = session.take_notice() {
            println!("{message}");
        }
        if session.state() == RunState::Stopped {
            log::info!(
                "Goal reached after {} ticks ({:.1} s simulated)",
                tick + 1,
                (tick + 1) as f32 * dt
            );
            return;
        }
    }

    log::warn!("Goal not reached within {} ticks", max_ticks);
    std::process::exit(2);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
