//! Exam screens
//!
//! Each screen owns its own video element but shares the one supervisor of
//! the attempt. Exam content itself is out of scope; a screen only decides
//! whether its content may be shown.

use std::fmt;
use std::sync::Arc;

use proctor_core::{FrameSize, ProctorResult, SupervisorState};
use proctor_runtime::{SupervisorHandle, TeardownReason};
use proctor_test::RecordingSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Instructions,
    Sections,
    Questions,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Instructions, Screen::Sections, Screen::Questions];

    pub fn next(self) -> Option<Screen> {
        match self {
            Screen::Instructions => Some(Screen::Sections),
            Screen::Sections => Some(Screen::Questions),
            Screen::Questions => None,
        }
    }

    /// Video element size on this screen
    fn video_size(self) -> FrameSize {
        match self {
            Screen::Instructions => FrameSize::new(640, 480),
            Screen::Sections | Screen::Questions => FrameSize::new(320, 240),
        }
    }
}

impl std::str::FromStr for Screen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instructions" | "i" => Ok(Screen::Instructions),
            "sections" | "s" => Ok(Screen::Sections),
            "questions" | "q" => Ok(Screen::Questions),
            other => Err(format!("unknown screen: {}", other)),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Screen::Instructions => "instructions",
            Screen::Sections => "sections",
            Screen::Questions => "questions",
        };
        f.write_str(s)
    }
}

/// Navigation through the exam with one shared supervisor
pub struct ExamFlow {
    handle: SupervisorHandle,
    screen: Screen,
    sinks: Vec<(Screen, Arc<RecordingSink>)>,
}

impl ExamFlow {
    /// Sinks for every screen; the instructions sink must be the one the
    /// supervisor was spawned with
    pub fn new(handle: SupervisorHandle, instructions: Arc<RecordingSink>) -> Self {
        let sinks = Screen::ALL
            .into_iter()
            .map(|screen| match screen {
                Screen::Instructions => (screen, Arc::clone(&instructions)),
                _ => (screen, Arc::new(RecordingSink::new(screen.video_size()))),
            })
            .collect();

        ExamFlow {
            handle,
            screen: Screen::Instructions,
            sinks,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn sink(&self, screen: Screen) -> Option<Arc<RecordingSink>> {
        self.sinks
            .iter()
            .find(|(s, _)| *s == screen)
            .map(|(_, sink)| Arc::clone(sink))
    }

    /// Switch screens, moving the live video to the new screen's element
    pub async fn show(&mut self, screen: Screen) -> ProctorResult<()> {
        if let Some(sink) = self.sink(screen) {
            self.handle.bind_sink(sink).await?;
        }
        self.screen = screen;
        Ok(())
    }

    pub async fn next(&mut self) -> ProctorResult<Option<Screen>> {
        match self.screen.next() {
            Some(screen) => {
                self.show(screen).await?;
                Ok(Some(screen))
            }
            None => Ok(None),
        }
    }

    /// Can the exam content of the current screen be shown?
    pub fn content_visible(&self) -> bool {
        match self.screen {
            Screen::Instructions => true,
            Screen::Sections | Screen::Questions => self.handle.state().allows_exam(),
        }
    }

    pub async fn submit(&self) -> ProctorResult<()> {
        self.handle.teardown(TeardownReason::ExamSubmitted).await
    }

    pub fn state(&self) -> SupervisorState {
        self.handle.state()
    }
}
