//! Proctoring Demo Application
//!
//! Runs one supervised exam attempt against a simulated browser host:
//! - Permission grants and revocations from the console
//! - Face count changes fed to the scripted detector
//! - Three exam screens sharing one capture stream
//! - Degradation and recovery

mod screens;
mod ui;

use std::sync::Arc;

use proctor_core::SupervisorState;
use proctor_runtime::{
    init_tracing, HostPlatform, LogFormat, NavigationTarget, ProctoringSupervisor, SupervisorConfig,
    SupervisorHost,
};
use proctor_test::{RecordingSink, RecordingSurface, ScriptedDetector, SimulatedPlatform};

use screens::ExamFlow;
use ui::DemoUI;

/// Host that prints lifecycle callbacks. Violations are shown by the
/// UI's subscription.
struct ConsoleHost;

impl SupervisorHost for ConsoleHost {
    fn on_state_change(&self, state: SupervisorState) {
        ui::notify(&format!("supervisor {}", state));
    }

    fn navigate(&self, target: NavigationTarget) {
        ui::notify(&format!("navigate to {:?}", target));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut format = LogFormat::default();
    let mut strict = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--strict" => strict = true,
            other => format = other.trim_start_matches("--log=").parse()?,
        }
    }
    init_tracing(format);

    let mut config = SupervisorConfig::from_env()?;
    if strict {
        config.revocation = SupervisorConfig::strict().revocation;
    }

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           Proctoring Demo - Supervised Exam                ║");
    println!("║     Simulated camera, microphone and face detector         ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Permission poll {:?}, sampling every {:?}, microphone loss: {:?}",
        config.permission_poll_interval, config.sample_interval, config.revocation.microphone
    );

    let platform = Arc::new(SimulatedPlatform::new().with_change_feed());
    let detector = Arc::new(ScriptedDetector::default());
    let sink = Arc::new(RecordingSink::default());
    let surface = Arc::new(RecordingSurface::new());

    let handle = ProctoringSupervisor::spawn(
        HostPlatform {
            permissions: platform.clone(),
            devices: platform.clone(),
            detector: detector.clone(),
            sink: sink.clone(),
            surface: Some(surface.clone()),
            host: Arc::new(ConsoleHost),
        },
        config,
    )?;
    handle.start().await?;
    tracing::info!("supervision started, waiting for permissions");

    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║  Commands:                                                 ║");
    println!("║    /allow camera|mic   - Answer the permission prompt      ║");
    println!("║    /grant camera|mic   - Grant in browser settings         ║");
    println!("║    /revoke camera|mic  - Revoke in browser settings        ║");
    println!("║    /faces <n>          - Faces visible to the camera       ║");
    println!("║    /busy on|off        - Device held by another app        ║");
    println!("║    /sinkerr            - Video element playback error      ║");
    println!("║    /recover            - Retry after degradation           ║");
    println!("║    /next, /screen <s>  - Change exam screen                ║");
    println!("║    /submit             - Submit the exam                   ║");
    println!("║    /leave              - Leave the waiting screen          ║");
    println!("║    /status             - Show supervisor status            ║");
    println!("║    /quit               - Exit                              ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let flow = ExamFlow::new(handle.clone(), sink);
    let mut ui = DemoUI::new(handle, flow, platform, detector, surface);

    ui.run().await?;

    println!("Goodbye!");
    Ok(())
}
