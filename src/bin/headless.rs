//! logic-bridge-headless binary
//!
//! Installs a bridge over the in-memory `HeadlessHost` and drives it from a
//! scripted logic loop that goes through the same C function table a real
//! logic engine receives.  Useful for smoke-testing the boundary and for
//! watching the log output of each operation.
//!
//! ## Configuration
//!
//! Run parameters come from the CLI / environment:
//!
//! | Key                    | Default | Description                          |
//! |------------------------|---------|--------------------------------------|
//! | `BRIDGE_CONFIG`        | –       | Optional TOML file for `BridgeConfig`|
//! | `BRIDGE_TICK_RATE_HZ`  | `30`    | Tick rate                            |
//! | `BRIDGE_TICKS`         | `90`    | Ticks to run (0 = until Ctrl-C)      |
//! | `BRIDGE_ACTORS`        | `4`     | Actors spawned by the logic loop     |
//!
//! `BridgeConfig` itself is loaded with the `config` crate from the file
//! above, overridden by `BRIDGE__*` variables (e.g.
//! `BRIDGE__REBIND_POLICY=stack`).

use anyhow::{Context, Result};
use clap::Parser;
use logic_bridge::{
    ffi::{self, HostApi},
    ActionState, ActorHandle, BodyHandle, Bridge, BridgeConfig, Color, ComponentDescriptor,
    ComponentFilter, Entity, HeadlessHost, HitResult, Quaternion, Vector3,
};
use std::time::Duration;
use tracing::info_span;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "logic-bridge-headless", about = "Headless logic bridge driver", version)]
struct Args {
    /// TOML file with bridge settings
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<String>,

    /// Tick rate (Hz), must be positive
    #[arg(long, env = "BRIDGE_TICK_RATE_HZ", default_value_t = 30.0, value_parser = parse_tick_rate)]
    tick_rate_hz: f32,

    /// Number of ticks to run; 0 runs until interrupted
    #[arg(long, env = "BRIDGE_TICKS", default_value_t = 90)]
    ticks: u64,

    /// Actors spawned by the scripted logic loop
    #[arg(long, env = "BRIDGE_ACTORS", default_value_t = 4)]
    actors: u32,
}

fn parse_tick_rate(raw: &str) -> std::result::Result<f32, String> {
    let rate: f32 = raw.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("tick rate must be a positive number of Hz, got {rate}"))
    }
}

/// Frame length for `rate_hz`.
fn tick_interval(rate_hz: f32) -> Result<(f32, Duration)> {
    anyhow::ensure!(
        rate_hz.is_finite() && rate_hz > 0.0,
        "tick rate must be positive, got {}",
        rate_hz
    );
    let dt = 1.0 / rate_hz;
    let period = Duration::try_from_secs_f32(dt)
        .with_context(|| format!("tick rate {}Hz gives an unusable period", rate_hz))?;
    anyhow::ensure!(!period.is_zero(), "tick rate {}Hz is too high", rate_hz);
    Ok((dt, period))
}

fn load_config(path: Option<&str>) -> Result<BridgeConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder
        .add_source(config::Environment::with_prefix("BRIDGE").prefix_separator("__"))
        .build()
        .context("reading bridge configuration")?
        .try_deserialize()
        .context("decoding bridge configuration")
}

// ---------------------------------------------------------------------------
// Scripted logic side
// ---------------------------------------------------------------------------

const JUMP: &str = "Jump";
const MOVE_FORWARD: &str = "MoveForward";

/// Minimal stand-in for a logic engine: owns entity ids and talks to the
/// host only through the function table.
struct ScriptedLogic {
    api: HostApi,
    bodies: Vec<(Entity, ActorHandle, BodyHandle)>,
}

impl ScriptedLogic {
    fn new(api: HostApi) -> Self {
        Self {
            api,
            bodies: Vec::new(),
        }
    }

    fn setup(&mut self, actors: u32) {
        let camera = (self.api.spawn_actor)(
            1,
            Vector3::new(0.0, -500.0, 200.0),
            Quaternion::IDENTITY,
            Vector3::ONE,
        );
        (self.api.set_view_target)(camera);

        for i in 0..actors {
            let entity = Entity::new(u64::from(i) + 1);
            let actor = (self.api.spawn_actor)(
                0,
                Vector3::new(i as f32 * 200.0, 0.0, 100.0),
                Quaternion::IDENTITY,
                Vector3::ONE,
            );
            if (self.api.set_entity_for_actor)(actor, entity) == 0 {
                tracing::warn!("could not bind {} to {}", entity, actor);
                continue;
            }
            if let Some(body) = self.first_body(actor) {
                self.bodies.push((entity, actor, body));
            }
        }
    }

    fn first_body(&self, actor: ActorHandle) -> Option<BodyHandle> {
        let mut len = 0usize;
        let mut out = [ComponentDescriptor::default(); 4];
        unsafe {
            (self.api.get_actor_components)(actor, 0, std::ptr::null_mut(), &mut len);
            len = len.min(out.len());
            (self.api.get_actor_components)(actor, 0, out.as_mut_ptr(), &mut len);
        }
        out[..len].iter().find_map(ComponentDescriptor::as_body)
    }

    fn tick(&mut self) {
        let mut jump = ActionState::Nothing;
        let mut forward = 0.0f32;
        unsafe {
            (self.api.get_action_state)(JUMP.as_ptr(), JUMP.len(), &mut jump);
            (self.api.get_axis_value)(MOVE_FORWARD.as_ptr(), MOVE_FORWARD.len(), &mut forward);
        }

        for (entity, actor, body) in &self.bodies {
            if jump == ActionState::Pressed && (self.api.is_simulating)(*body) != 0 {
                (self.api.add_impulse)(*body, Vector3::new(0.0, 0.0, 400.0));
            }
            (self.api.add_force)(*body, Vector3::new(forward * 100.0, 0.0, -980.0));

            let mut position = Vector3::ZERO;
            unsafe {
                (self.api.get_spatial_data)(
                    *actor,
                    &mut position,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                );
            }

            // Probe from just under the actor's own collision sphere.
            let from = Vector3::new(position.x, position.y, position.z - 60.0);
            let below = Vector3::new(position.x, position.y, position.z - 1000.0);
            let mut hit = HitResult::default();
            let grounded = unsafe { (self.api.line_trace)(from, below, &mut hit) } != 0;
            (self.api.visual_log_segment)(
                *actor,
                from,
                below,
                if grounded { Color::GREEN } else { Color::RED },
            );

            if position.z < 0.0 {
                let line = format!("{} fell below ground at {}", entity, position);
                unsafe { (self.api.log)(line.as_ptr(), line.len() as i32) };
                (self.api.set_spatial_data)(
                    *actor,
                    Vector3::new(position.x, position.y, 100.0),
                    Quaternion::IDENTITY,
                    Vector3::ONE,
                );
                (self.api.set_velocity)(*body, Vector3::ZERO);
            }
        }
    }

    fn bound_actor_count(&self) -> u64 {
        let mut len = 0u64;
        unsafe { (self.api.iterate_actors)(std::ptr::null_mut(), &mut len) };
        len
    }
}

// ---------------------------------------------------------------------------
// Host setup
// ---------------------------------------------------------------------------

fn make_host() -> HeadlessHost {
    let mut host = HeadlessHost::new();
    let input = host.input_mut();
    input.bind_action(JUMP, "SpaceBar");
    input.bind_action(JUMP, "Gamepad_FaceButton_Bottom");
    input.bind_axis(MOVE_FORWARD, "W", 1.0);
    input.bind_axis(MOVE_FORWARD, "S", -1.0);
    host
}

/// Host-side per-frame work: make every bound primitive simulate, feed a
/// scripted key pattern, then advance the world.
fn step_host(bridge: &mut Bridge, frame: u64, dt: f32) {
    let actors: Vec<_> = {
        let mut actors = vec![ActorHandle::NULL; bridge.bound_actors(None)];
        let n = bridge.bound_actors(Some(&mut actors));
        actors.truncate(n);
        actors
    };
    let mut descriptors = [ComponentDescriptor::default(); 4];
    let bodies: Vec<BodyHandle> = actors
        .into_iter()
        .filter_map(|actor| {
            let n = bridge
                .components(actor, ComponentFilter::Primitive, Some(&mut descriptors))
                .ok()?;
            descriptors[..n].iter().find_map(ComponentDescriptor::as_body)
        })
        .collect();

    let Some(host) = bridge.downcast_host_mut::<HeadlessHost>() else {
        return;
    };
    for body in bodies {
        host.set_simulating(body, true);
    }

    let input = host.input_mut();
    match frame % 60 {
        0 => input.press("SpaceBar"),
        5 => input.release("SpaceBar"),
        20 => input.press("W"),
        40 => input.release("W"),
        _ => {}
    }
    host.step(dt);
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("logic_bridge=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    log::info!(
        "Starting logic-bridge-headless (rate={}Hz, ticks={}, actors={}, rebind={:?})",
        args.tick_rate_hz,
        args.ticks,
        args.actors,
        config.rebind_policy,
    );

    let host = make_host();
    let recorder = host.recorder();
    ffi::install(Bridge::new(config, Box::new(host)));

    let mut logic = ScriptedLogic::new(ffi::host_api());
    logic.setup(args.actors);
    log::info!("{} actors bound", logic.bound_actor_count());

    let (dt, period) = tick_interval(args.tick_rate_hz)?;
    let mut timer = tokio::time::interval(period);
    let mut frame = 0u64;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let _span = info_span!("tick", frame).entered();
                logic.tick();
                ffi::with_context(|bridge| step_host(bridge, frame, dt))
                    .context("bridge context vanished mid-run")?;
                frame += 1;
                if args.ticks != 0 && frame >= args.ticks {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("logic-bridge-headless shutting down (SIGINT)");
                break;
            }
        }
    }

    let bridge = ffi::teardown().context("bridge context missing at shutdown")?;
    log::info!(
        "Ran {} frames; {} log lines, {} debug segments recorded",
        frame,
        recorder.lines().len(),
        recorder.segments().len(),
    );
    println!("{}", serde_json::to_string_pretty(&bridge.stats())?);
    Ok(())
}
