//! Castle Vignettes entry point
//!
//! Handles platform-specific initialization and runs the scene loop. The
//! page decides which vignette to show by which canvas it provides:
//! `#rampart-canvas` or `#flyover-canvas`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

    use castle_vignettes::Settings;
    use castle_vignettes::audio::{AudioManager, SoundEffect};
    use castle_vignettes::flyover::{
        self, Cinematic, OrbitCamera, World, WorldEvent, camera::CameraPose,
    };
    use castle_vignettes::rampart::{self, FrameInput, Layout, SceneEvent, SceneState};
    use castle_vignettes::renderer::{FlyoverRenderState, RampartRenderState};
    use glam::Vec2;

    /// Device pixel ratio, capped at 2 to bound the framebuffer size
    fn pixel_ratio() -> f64 {
        web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .clamp(1.0, 2.0)
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0)
    }

    /// Size the canvas backing store from its CSS size; returns (w, h) px
    fn fit_canvas(canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = pixel_ratio();
        let width = ((canvas.client_width() as f64 * dpr) as u32).max(1);
        let height = ((canvas.client_height() as f64 * dpr) as u32).max(1);
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'static>,
    ) -> wgpu::Adapter {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter")
    }

    fn set_cursor(canvas: &HtmlCanvasElement, cursor: &str) {
        if let Some(el) = canvas.dyn_ref::<HtmlElement>() {
            let _ = el.style().set_property("cursor", cursor);
        }
    }

    // ========================================================================
    // Rampart vignette
    // ========================================================================

    struct RampartApp {
        state: SceneState,
        layout: Layout,
        render_state: Option<RampartRenderState>,
        input: FrameInput,
        audio: AudioManager,
        settings: Settings,
        canvas: HtmlCanvasElement,
        last_time: f64,
        was_over: bool,
    }

    impl RampartApp {
        fn new(seed: u64, canvas: HtmlCanvasElement) -> Self {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.set_muted(!settings.sound_enabled);
            Self {
                state: SceneState::new(seed),
                layout: Layout::compute(
                    canvas.client_width() as f32,
                    canvas.client_height() as f32,
                ),
                render_state: None,
                input: FrameInput::default(),
                audio,
                settings,
                canvas,
                last_time: 0.0,
                was_over: false,
            }
        }

        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                ((time - self.last_time) / 1000.0) as f32
            } else {
                1.0 / 60.0
            };
            self.last_time = time;

            self.layout = Layout::compute(
                self.canvas.client_width() as f32,
                self.canvas.client_height() as f32,
            );
            rampart::tick(&mut self.state, &self.layout, &self.input, dt);
            self.input.click = false;

            for event in self.state.events.drain(..) {
                match event {
                    SceneEvent::BalloonPopped { .. } => self.audio.play(SoundEffect::BalloonPop),
                }
            }
        }

        fn render(&mut self, time: f64) {
            let (state, layout, settings) = (&self.state, &self.layout, &self.settings);
            if let Some(render_state) = self.render_state.as_mut() {
                match render_state.render(state, layout, settings, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        fn update_hud(&mut self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(el) = document.get_element_by_id("score-value") {
                el.set_text_content(Some(&self.state.score.to_string()));
            }
            if self.state.over_balloon != self.was_over {
                self.was_over = self.state.over_balloon;
                let cursor = if self.state.over_balloon {
                    "pointer"
                } else {
                    "default"
                };
                set_cursor(&self.canvas, cursor);
            }
        }
    }

    pub async fn run_rampart(canvas: HtmlCanvasElement) {
        let (width, height) = fit_canvas(&canvas);
        let seed = js_sys::Date::now() as u64;
        let app = Rc::new(RefCell::new(RampartApp::new(seed, canvas.clone())));
        log::info!("Rampart vignette starting with seed {seed}");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");
        let adapter = request_adapter(&instance, &surface).await;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = RampartRenderState::new(surface, &adapter, width, height).await;
        app.borrow_mut().render_state = Some(render_state);

        // Pointer move
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut a = app.borrow_mut();
                a.input.pointer =
                    Some(Vec2::new(event.offset_x() as f32, event.offset_y() as f32));
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click to pop (also the user gesture that unlocks audio)
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut a = app.borrow_mut();
                a.input.pointer =
                    Some(Vec2::new(event.offset_x() as f32, event.offset_y() as f32));
                a.input.click = true;
                a.audio.resume();
            });
            let _ = canvas
                .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        setup_sound_toggle(app.clone());
        setup_resize(canvas.clone(), {
            let app = app.clone();
            move |w, h| {
                if let Some(rs) = app.borrow_mut().render_state.as_mut() {
                    rs.resize(w, h);
                }
            }
        });

        request_frame(move |time| {
            let mut a = app.borrow_mut();
            a.update(time);
            a.render(time);
            a.update_hud();
        });

        log::info!("Rampart vignette running");
    }

    fn setup_sound_toggle(app: Rc<RefCell<RampartApp>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(btn) = document.get_element_by_id("sound-toggle") else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut a = app.borrow_mut();
            a.settings.sound_enabled = !a.settings.sound_enabled;
            a.settings.save();
            let enabled = a.settings.sound_enabled;
            a.audio.set_muted(!enabled);
            if enabled {
                a.audio.resume();
            }
            drop(a);

            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                if let Some(btn) = document.get_element_by_id("sound-toggle") {
                    btn.set_text_content(Some(if enabled { "\u{1F50A}" } else { "\u{1F507}" }));
                    let _ = btn.set_attribute("aria-pressed", &(!enabled).to_string());
                }
            }
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // ========================================================================
    // Flyover vignette
    // ========================================================================

    struct FlyoverApp {
        world: World,
        cinematic: Cinematic,
        orbit: OrbitCamera,
        pose: CameraPose,
        render_state: Option<FlyoverRenderState>,
        audio: AudioManager,
        settings: Settings,
        last_time: f64,
        dragging: bool,
    }

    impl FlyoverApp {
        fn new(seed: u64) -> Self {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.set_muted(!settings.sound_enabled);
            Self {
                world: World::new(seed),
                cinematic: Cinematic::new(),
                orbit: OrbitCamera::from_pose(&Cinematic::final_pose()),
                pose: flyover::camera::initial_pose(),
                render_state: None,
                audio,
                settings,
                last_time: 0.0,
                dragging: false,
            }
        }

        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                ((time - self.last_time) / 1000.0) as f32
            } else {
                1.0 / 60.0
            };
            self.last_time = time;

            flyover::tick(&mut self.world, dt);
            for event in self.world.events.drain(..) {
                match event {
                    WorldEvent::CannonFired { .. } => self.audio.play(SoundEffect::CannonFire),
                    WorldEvent::ProjectileLanded { .. } => {
                        self.audio.play(SoundEffect::CannonImpact)
                    }
                }
            }

            self.pose = match self.cinematic.update(time) {
                Some(pose) => {
                    if !self.cinematic.playing() {
                        // Sweep just finished; hand the pose to the orbit
                        self.orbit = OrbitCamera::from_pose(&pose);
                    }
                    pose
                }
                None => {
                    self.orbit.update(dt);
                    self.orbit.pose()
                }
            };
        }

        fn render(&mut self, time: f64) {
            let (world, pose, settings) = (&self.world, &self.pose, &self.settings);
            if let Some(render_state) = self.render_state.as_mut() {
                match render_state.render(world, pose, settings, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }
    }

    pub async fn run_flyover(canvas: HtmlCanvasElement) {
        let (width, height) = fit_canvas(&canvas);
        let seed = js_sys::Date::now() as u64;
        let app = Rc::new(RefCell::new(FlyoverApp::new(seed)));
        log::info!("Flyover vignette starting with seed {seed}");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");
        let adapter = request_adapter(&instance, &surface).await;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let permutation = app.borrow().world.terrain.noise().permutation_u32();
        let render_state =
            FlyoverRenderState::new(surface, &adapter, width, height, &permutation).await;
        app.borrow_mut().render_state = Some(render_state);

        // Fly in, unless the viewer asked for reduced motion
        if app.borrow().settings.reduced_motion {
            log::info!("Reduced motion set; skipping the cinematic");
        } else {
            app.borrow_mut().cinematic.start(now_ms());
        }

        // Orbit drag
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                app.borrow_mut().dragging = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                app.borrow_mut().dragging = false;
            });
            let _ = canvas
                .add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref());
            let _ = canvas
                .add_event_listener_with_callback("mouseleave", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut a = app.borrow_mut();
                if a.dragging && !a.cinematic.playing() {
                    a.orbit
                        .drag(event.movement_x() as f32, event.movement_y() as f32);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Wheel zoom
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: WheelEvent| {
                event.prevent_default();
                let mut a = app.borrow_mut();
                if !a.cinematic.playing() {
                    a.orbit.zoom(event.delta_y() as f32);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Replay button restarts the sweep
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            if let Some(btn) = document.get_element_by_id("replay-cinematic") {
                let app = app.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    app.borrow_mut().cinematic.start(now_ms());
                    log::info!("Replaying cinematic");
                });
                let _ =
                    btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }

        setup_resize(canvas.clone(), {
            let app = app.clone();
            move |w, h| {
                if let Some(rs) = app.borrow_mut().render_state.as_mut() {
                    rs.resize(w, h);
                }
            }
        });

        request_frame(move |time| {
            let mut a = app.borrow_mut();
            a.update(time);
            a.render(time);
        });

        log::info!("Flyover vignette running");
    }

    // ========================================================================
    // Shared wiring
    // ========================================================================

    fn setup_resize(canvas: HtmlCanvasElement, mut on_resize: impl FnMut(u32, u32) + 'static) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (w, h) = fit_canvas(&canvas);
            on_resize(w, h);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Drive `frame` from requestAnimationFrame, forever
    fn request_frame(frame: impl FnMut(f64) + 'static) {
        fn schedule(frame: Rc<RefCell<dyn FnMut(f64)>>) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let closure = Closure::once(move |time: f64| {
                (&mut *frame.borrow_mut())(time);
                schedule(frame);
            });
            let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
            closure.forget();
        }
        schedule(Rc::new(RefCell::new(frame)));
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document");
            return;
        };

        if let Some(canvas) = document
            .get_element_by_id("rampart-canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        {
            run_rampart(canvas).await;
        } else if let Some(canvas) = document
            .get_element_by_id("flyover-canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        {
            run_flyover(canvas).await;
        } else {
            log::error!("No vignette canvas found (#rampart-canvas or #flyover-canvas)");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Castle Vignettes (native) starting...");
    log::info!("Rendering requires a browser - run with `trunk serve` for the web version");

    println!("\nRunning headless smoke pass...");
    smoke_rampart();
    smoke_flyover();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn smoke_rampart() {
    use castle_vignettes::rampart::{FrameInput, Layout, SceneState, tick};
    use glam::Vec2;

    let layout = Layout::compute(1280.0, 720.0);
    let mut state = SceneState::new(7);
    for _ in 0..120 {
        tick(&mut state, &layout, &FrameInput::default(), 1.0 / 60.0);
    }
    assert!(!state.balloons.is_empty(), "spawner never filled the sky");

    // Click straight at a live balloon and expect the score to move
    let target = state.balloons[state.balloons.len() - 1].pos;
    let input = FrameInput {
        pointer: Some(Vec2::new(target.x, target.y)),
        click: true,
    };
    tick(&mut state, &layout, &input, 1.0 / 60.0);
    assert_eq!(state.score, 1);
    println!("✓ Rampart smoke pass ok (score {})", state.score);
}

#[cfg(not(target_arch = "wasm32"))]
fn smoke_flyover() {
    use castle_vignettes::flyover::{World, tick};

    let mut world = World::new(7);
    for _ in 0..600 {
        tick(&mut world, 1.0 / 60.0);
    }
    assert!(
        !world.events.is_empty(),
        "ten seconds without a single cannon shot"
    );
    println!(
        "✓ Flyover smoke pass ok ({} events, {} puffs)",
        world.events.len(),
        world.puffs.len()
    );
}
