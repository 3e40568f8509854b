//! Orbit demo
//!
//! Headless solar system driven by the scene kernel: planets orbit a sun,
//! moons orbit planets, and a comet is launched every second and burns out.
//! A console camera prints the tree every half second.
//!
//! Usage: `orbit_demo [config.toml|config.ron]`

use scene_kernel::prelude::*;
use thiserror::Error;

/// Ticks before the demo stops itself
const DEMO_TICKS: u64 = 240;

/// Ticks between comet launches
const COMET_INTERVAL: u64 = 60;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Game loop error: {0}")]
    Loop(#[from] LoopError),
}

/// A body on a circular orbit around its parent
struct Body {
    name: &'static str,
    radius: f64,
    angular_speed: f64,
    angle: f64,
}

impl Body {
    fn node(name: &'static str, radius: f64, period: f64) -> Node {
        let angular_speed = if period > 0.0 { std::f64::consts::TAU / period } else { 0.0 };
        Node::new(Self {
            name,
            radius,
            angular_speed,
            angle: 0.0,
        })
        .with_tag(name)
    }
}

impl Behavior for Body {
    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATE | Capabilities::DRAW
    }

    fn class_tags(&self) -> &'static [&'static str] {
        &["body"]
    }

    fn update(&mut self, _ctx: &mut NodeContext<'_>, time: &TimeStep) {
        self.angle = (self.angle + self.angular_speed * time.delta) % std::f64::consts::TAU;
    }

    fn draw(&mut self, _camera: &mut dyn Camera, _time: &TimeStep) {
        let (x, y) = (self.radius * self.angle.cos(), self.radius * self.angle.sin());
        log::debug!("{} at ({x:.2}, {y:.2}) relative to its parent", self.name);
    }

    fn on_attached(&mut self, ctx: &mut NodeContext<'_>) {
        log::info!("{} entered orbit as {}", self.name, ctx.id());
    }
}

/// Short-lived body that removes itself
struct Comet {
    life: f64,
}

impl Behavior for Comet {
    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATE | Capabilities::DRAW
    }

    fn class_tags(&self) -> &'static [&'static str] {
        &["comet"]
    }

    fn update(&mut self, ctx: &mut NodeContext<'_>, time: &TimeStep) {
        self.life -= time.delta;
        if self.life <= 0.0 && !ctx.scene().is_pending_removal(ctx.id()) {
            let _ = ctx.remove_self();
        }
    }

    fn on_detached(&mut self, ctx: &mut NodeContext<'_>) {
        log::info!("Comet {} burned out", ctx.id());
    }
}

/// Camera that prints the drawn tree, indented by nesting depth
struct ConsoleCamera {
    every: u64,
    frame: u64,
    depth: usize,
}

impl Behavior for ConsoleCamera {
    fn class_tags(&self) -> &'static [&'static str] {
        &[CAMERA_TAG]
    }

    fn as_camera(&mut self) -> Option<&mut dyn Camera> {
        Some(self)
    }
}

impl Camera for ConsoleCamera {
    fn clear(&mut self) {
        self.frame += 1;
        self.depth = 0;
    }

    fn calculate_view(&mut self, time: &TimeStep) {
        if self.printing() {
            log::info!("Frame {} (animation time {:.2}s)", self.frame, time.animation_time);
        }
    }

    fn save_state(&mut self) {
        self.depth += 1;
    }

    fn restore_state(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn allow_draw(&self, _node: &NodeView<'_>) -> bool {
        self.printing()
    }

    fn draw_object(&mut self, node: &mut dyn Behavior, view: &NodeView<'_>, time: &TimeStep) {
        let tags: Vec<&str> = view.tags.iter().map(String::as_str).collect();
        log::info!("{:indent$}{} [{}]", "", view.id, tags.join(", "), indent = self.depth * 2);
        node.draw(self, time);
    }
}

impl ConsoleCamera {
    fn printing(&self) -> bool {
        self.frame % self.every == 0
    }
}

fn build_system(game: &mut GameLoop) {
    let root = game.scene().root();
    let scene = game.scene_mut();

    let _camera = scene.add(
        Node::new(ConsoleCamera {
            every: 30,
            frame: 0,
            depth: 0,
        }),
        root,
    );

    let sun = scene.add(Body::node("sun", 0.0, 0.0), root);
    let Some(sun) = sun.ticket() else {
        return;
    };
    let _earth = scene.add(
        Body::node("earth", 10.0, 4.0).with_child(Body::node("moon", 1.5, 1.0)),
        sun,
    );
    let _mars = scene.add(
        Body::node("mars", 15.0, 7.5)
            .with_child(Body::node("phobos", 0.8, 0.5))
            .with_child(Body::node("deimos", 1.6, 1.2)),
        sun,
    );
}

fn comet_launcher(ctx: &mut ControlContext<'_>) {
    let tick = ctx.clock().tick_count();
    if tick >= DEMO_TICKS {
        ctx.request_stop();
        return;
    }
    if tick % COMET_INTERVAL != 0 {
        return;
    }

    let scene = ctx.scene();
    let Some(sun) = scene.query(&["sun"], QueryMode::Inclusive).first().copied() else {
        return;
    };
    let _ = scene.add(Node::new(Comet { life: 1.5 }), sun);
}

fn run() -> Result<(), DemoError> {
    let mut game = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            GameLoop::from_config_file(&path)?
        }
        None => GameLoop::new(SchedulerConfig::default())?,
    };

    build_system(&mut game);
    game.add_controller(comet_launcher);

    game.start();
    game.run();

    let clock = game.clock();
    log::info!(
        "Demo finished after {} ticks and {} updates; {} nodes remain",
        clock.tick_count(),
        clock.update_count(),
        game.scene().len()
    );
    Ok(())
}

fn main() {
    scene_kernel::foundation::logging::init();
    log::info!("Starting orbit demo");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
