//! Demo UI - Terminal-based console for the simulated host

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use proctor_core::{AcquisitionError, DeviceKind, SupervisorState};
use proctor_runtime::SupervisorHandle;
use proctor_test::{RecordingSurface, ScriptedDetector, SimulatedPlatform};

use crate::screens::{ExamFlow, Screen};

/// Print an asynchronous notice and restore the prompt
pub fn notify(line: &str) {
    println!("\n{}", line);
    print!("> ");
    let _ = io::stdout().flush();
}

fn parse_device(arg: &str) -> Option<DeviceKind> {
    match arg {
        "camera" | "cam" | "c" => Some(DeviceKind::Camera),
        "microphone" | "mic" | "m" => Some(DeviceKind::Microphone),
        _ => None,
    }
}

/// Demo UI handler
pub struct DemoUI {
    handle: SupervisorHandle,
    flow: ExamFlow,
    platform: Arc<SimulatedPlatform>,
    detector: Arc<ScriptedDetector>,
    surface: Arc<RecordingSurface>,
}

impl DemoUI {
    pub fn new(
        handle: SupervisorHandle,
        flow: ExamFlow,
        platform: Arc<SimulatedPlatform>,
        detector: Arc<ScriptedDetector>,
        surface: Arc<RecordingSurface>,
    ) -> Self {
        Self {
            handle,
            flow,
            platform,
            detector,
            surface,
        }
    }

    /// Run the main UI loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Spawn violation display task
        let mut violations = self.handle.violations();
        let violations_handle = tokio::spawn(async move {
            loop {
                match violations.recv().await {
                    Ok(violation) => match serde_json::to_string(&violation) {
                        Ok(json) => notify(&format!("⚠️  {}", json)),
                        Err(_) => notify(&format!("⚠️  {}", violation)),
                    },
                    Err(RecvError::Lagged(missed)) => {
                        notify(&format!("⚠️  {} violations dropped", missed))
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        // Main input loop
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        print!("> ");
        io::stdout().flush()?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                print!("> ");
                io::stdout().flush()?;
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, ' ').collect();
            let cmd = parts[0];
            let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

            match cmd {
                "/quit" | "/exit" | "/q" => break,
                "/allow" => match parse_device(arg) {
                    Some(DeviceKind::Camera) => self.report(self.handle.request_camera().await),
                    Some(DeviceKind::Microphone) => {
                        self.report(self.handle.request_microphone().await)
                    }
                    None => println!("Usage: /allow camera|mic"),
                },
                "/grant" => match parse_device(arg) {
                    Some(device) => {
                        self.platform.grant(device);
                        println!("✅ {} granted", device);
                    }
                    None if arg == "all" => {
                        self.platform.grant_all();
                        println!("✅ camera and microphone granted");
                    }
                    None => println!("Usage: /grant camera|mic|all"),
                },
                "/revoke" => match parse_device(arg) {
                    Some(device) => {
                        self.platform.revoke(device);
                        println!("🚫 {} revoked", device);
                    }
                    None => println!("Usage: /revoke camera|mic"),
                },
                "/faces" => match arg.parse::<usize>() {
                    Ok(faces) => {
                        self.detector.set_faces(faces);
                        println!("👤 {} face(s) in view", faces);
                    }
                    Err(_) => println!("Usage: /faces <n>"),
                },
                "/busy" => match arg {
                    "on" => {
                        self.platform.fail_acquisition(Some(AcquisitionError::DeviceBusy(
                            "held by another application".into(),
                        )));
                        println!("📷 devices busy");
                    }
                    "off" => {
                        self.platform.fail_acquisition(None);
                        println!("📷 devices available");
                    }
                    _ => println!("Usage: /busy on|off"),
                },
                "/sinkerr" => {
                    let result = self.handle.report_sink_error("playback aborted").await;
                    self.report(result);
                }
                "/recover" | "/r" => match self.handle.recover().await {
                    Ok(state) => println!("✅ Recovered, supervisor {}", state),
                    Err(e) => println!("❌ {}", e),
                },
                "/next" | "/n" => match self.flow.next().await {
                    Ok(Some(screen)) => self.show_screen(screen),
                    Ok(None) => println!("Last screen, use /submit"),
                    Err(e) => println!("❌ {}", e),
                },
                "/screen" => match arg.parse::<Screen>() {
                    Ok(screen) => match self.flow.show(screen).await {
                        Ok(()) => self.show_screen(screen),
                        Err(e) => println!("❌ {}", e),
                    },
                    Err(e) => println!("{}", e),
                },
                "/submit" => match self.flow.submit().await {
                    Ok(()) => {
                        println!("📨 Exam Submitted");
                        break;
                    }
                    Err(e) => println!("❌ {}", e),
                },
                "/leave" => match self.handle.leave().await {
                    Ok(()) => {
                        println!("👋 Left the exam");
                        break;
                    }
                    Err(e) => println!("❌ {}", e),
                },
                "/status" | "/s" => self.show_status(),
                "/help" | "/h" => self.show_help(),
                _ => {
                    println!("Unknown command: {}", cmd);
                    println!("Type /help for available commands");
                }
            }

            if self.handle.state() == SupervisorState::Terminated {
                println!("Supervision ended");
                break;
            }

            print!("> ");
            io::stdout().flush()?;
        }

        violations_handle.abort();
        Ok(())
    }

    fn report(&self, result: proctor_core::ProctorResult<()>) {
        match result {
            Ok(()) => println!("✅ ok"),
            Err(e) => println!("❌ {}", e),
        }
    }

    fn show_screen(&self, screen: Screen) {
        if self.flow.content_visible() {
            println!("📄 {} screen", screen);
        } else {
            println!("📄 {} screen (hidden until supervision is active)", screen);
        }
    }

    fn show_status(&self) {
        let permissions = self.handle.permissions();
        println!("📊 Supervisor Status:");
        println!("   State: {}", self.handle.state());
        println!("   Screen: {}", self.flow.screen());
        println!("   Permissions: {}", permissions);
        for device in DeviceKind::ALL {
            if let Some(reason) = self.handle.permission_error(device) {
                println!("   {} error: {}", device, reason);
            }
        }
        if let Some(cause) = self.handle.degraded_cause() {
            println!("   Degraded: {}", cause.detail());
        }
        println!("   Generation: {}", self.handle.generation());
        match self.handle.stream_id() {
            Some(id) => println!("   Stream: {} (bound: {})", id, self.handle.is_bound()),
            None => println!("   Stream: none"),
        }
        println!("   Overlay boxes: {}", self.surface.drawn().len());
        if let Ok(stats) = serde_json::to_string(&self.handle.stats()) {
            println!("   Stats: {}", stats);
        }
        let monitor = self.handle.monitor_stats();
        println!(
            "   Monitor: {} samples, {} skipped ticks",
            monitor.samples, monitor.skipped_ticks
        );
    }

    fn show_help(&self) {
        println!("Commands:");
        println!("  /allow camera|mic   - Answer the permission prompt");
        println!("  /grant camera|mic   - Grant in browser settings");
        println!("  /revoke camera|mic  - Revoke in browser settings");
        println!("  /faces <n>          - Faces visible to the camera");
        println!("  /busy on|off        - Device held by another app");
        println!("  /sinkerr            - Video element playback error");
        println!("  /recover            - Retry after degradation");
        println!("  /next, /screen <s>  - Change exam screen");
        println!("  /submit             - Submit the exam");
        println!("  /leave              - Leave the waiting screen");
        println!("  /status             - Show supervisor status");
        println!("  /quit               - Exit");
    }
}
