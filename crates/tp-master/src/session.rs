//! One running session: rig, directive channel, conductor and cues,
//! advanced block by block on the audio clock.

use tp_engine::{Frame, Rig};
use tp_ir::{Directive, InteractionEvent, InteractionSnapshot};
use tracing::{debug, info};

use crate::conductor::{Conductor, RuleConductor, SilentConductor};
use crate::config::{ConductorKind, Cue, CueAction, DirectivePayload, SessionConfig};
use crate::directive::DirectiveChannel;

/// Input delivered to a session from outside the audio loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Snapshot(InteractionSnapshot),
    Event(InteractionEvent),
    /// Raw JSON directive from an external advisor.
    Directive(String),
    Stop,
}

pub struct Session {
    rig: Rig,
    channel: DirectiveChannel,
    conductor: Box<dyn Conductor>,
    cues: Vec<Cue>,
    next_cue: usize,
    snapshot: InteractionSnapshot,
    directive_interval: f64,
    next_directive: f64,
    block_frames: usize,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        let initial = config.directive.initial.unwrap_or_default();
        let conductor: Box<dyn Conductor> = match config.directive.conductor {
            ConductorKind::Rules => Box::new(RuleConductor),
            ConductorKind::Off => Box::new(SilentConductor),
        };
        let mut cues = config.cues.clone();
        cues.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            rig: Rig::new(config.rig_config()),
            channel: DirectiveChannel::new(initial, config.directive.base_lerp),
            conductor,
            cues,
            next_cue: 0,
            snapshot: InteractionSnapshot::default(),
            directive_interval: config.directive.interval_s,
            next_directive: 0.0,
            block_frames: config.engine.block_frames,
        }
    }

    pub fn with_conductor(mut self, conductor: Box<dyn Conductor>) -> Self {
        self.conductor = conductor;
        self
    }

    pub fn start(&mut self) {
        if self.rig.is_running() {
            return;
        }
        let current = *self.channel.current();
        self.apply_directive(current);
        self.rig.start();
        self.next_directive = self.rig.now() + self.directive_interval;
        info!(interval_s = self.directive_interval, cues = self.cues.len(), "session started");
    }

    pub fn stop(&mut self) {
        self.rig.stop();
    }

    pub fn dispose(&mut self) {
        self.rig.dispose();
    }

    /// Handle an external command. Returns false for [`Command::Stop`].
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Snapshot(snapshot) => self.set_snapshot(snapshot),
            Command::Event(event) => self.rig.push_event(event),
            Command::Directive(json) => {
                if self.channel.submit_json(&json).is_ok() {
                    self.blend_directive();
                }
            }
            Command::Stop => return false,
        }
        true
    }

    /// Render one block: due cues and directive cycles first, then audio.
    pub fn render_block(&mut self, out: &mut [Frame]) {
        let rate = self.rig.config().sample_rate as f64;
        let start = self.rig.graph().now();
        let end = start + out.len() as f64 / rate;

        while let Some(cue) = self.cues.get(self.next_cue) {
            if cue.at >= end {
                break;
            }
            let action = cue.action.clone();
            self.next_cue += 1;
            self.run_cue(action);
        }

        if self.rig.is_running() && start >= self.next_directive {
            self.directive_cycle();
            self.next_directive += self.directive_interval;
        }

        self.rig.render(out);
    }

    /// Render `seconds` of audio in configured blocks.
    pub fn render_seconds(&mut self, seconds: f64) -> Vec<Frame> {
        let rate = self.rig.config().sample_rate as f64;
        let total = (seconds.max(0.0) * rate) as usize;
        let mut frames = vec![Frame::silence(); total];
        for block in frames.chunks_mut(self.block_frames) {
            self.render_block(block);
        }
        frames
    }

    fn run_cue(&mut self, action: CueAction) {
        debug!(?action, "cue");
        match action {
            CueAction::Snapshot(snapshot) => self.set_snapshot(snapshot),
            CueAction::PointerDown { speed } => {
                self.rig.push_event(InteractionEvent::PointerDown { speed })
            }
            CueAction::KeyPress { key } => self.rig.push_event(InteractionEvent::KeyPress { key }),
            CueAction::Directive { value } => {
                let accepted = match value {
                    DirectivePayload::Inline(d) => self.channel.submit(d),
                    DirectivePayload::Json(json) => self.channel.submit_json(&json),
                };
                if accepted.is_ok() {
                    self.blend_directive();
                }
            }
        }
    }

    fn set_snapshot(&mut self, snapshot: InteractionSnapshot) {
        self.snapshot = snapshot;
        self.rig.update_snapshot(snapshot);
    }

    fn directive_cycle(&mut self) {
        let target = *self.channel.target();
        if let Some(json) = self.conductor.propose(&self.snapshot, &target) {
            // A rejected proposal leaves the previous target in place.
            let _ = self.channel.submit_json(&json);
        }
        self.blend_directive();
    }

    fn blend_directive(&mut self) {
        let blended = self.channel.blend(&self.snapshot);
        self.apply_directive(blended);
    }

    fn apply_directive(&mut self, directive: Directive) {
        // Channel output is always valid; the rig re-checks anyway.
        let _ = self.rig.update_directive(directive);
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn channel(&self) -> &DirectiveChannel {
        &self.channel
    }

    pub fn snapshot(&self) -> &InteractionSnapshot {
        &self.snapshot
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::ScriptedConductor;
    use crate::config::Cue;

    fn quiet_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.engine.sample_rate = 8_000;
        config.directive.conductor = ConductorKind::Off;
        config.directive.interval_s = 1.0;
        config
    }

    #[test]
    fn renders_requested_length() {
        let mut session = Session::new(&quiet_config());
        session.start();
        let frames = session.render_seconds(0.5);
        assert_eq!(frames.len(), 4_000);
        assert!(frames.iter().any(|f| !f.is_silent()));
    }

    #[test]
    fn cues_fire_in_time_order() {
        let mut config = quiet_config();
        config.cues = vec![
            Cue {
                at: 0.4,
                action: CueAction::Snapshot(InteractionSnapshot { energy: 1.0, ..Default::default() }),
            },
            Cue {
                at: 0.1,
                action: CueAction::Snapshot(InteractionSnapshot { energy: 0.2, ..Default::default() }),
            },
        ];
        let mut session = Session::new(&config);
        session.start();
        session.render_seconds(0.2);
        assert_eq!(session.snapshot().energy, 0.2);
        session.render_seconds(0.3);
        assert_eq!(session.snapshot().energy, 1.0);
    }

    #[test]
    fn cued_invalid_directive_is_ignored() {
        let mut config = quiet_config();
        config.cues = vec![Cue {
            at: 0.0,
            action: CueAction::Directive {
                value: DirectivePayload::Json(r#"{"bpm": 500}"#.into()),
            },
        }];
        let mut session = Session::new(&config);
        session.start();
        session.render_seconds(0.1);
        assert_eq!(*session.rig().directive(), Directive::default());
    }

    #[test]
    fn scripted_conductor_retunes_voices_over_cycles() {
        let target = Directive { bpm: 150.0, ..Directive::default() };
        let json = serde_json::to_string(&target).unwrap();
        let mut session =
            Session::new(&quiet_config()).with_conductor(Box::new(ScriptedConductor::new([json])));
        session.start();
        session.render_seconds(3.5);
        assert_eq!(*session.channel().target(), target);
        let bpm = session.rig().directive().bpm;
        assert!(bpm > 96.0 && bpm < 150.0, "{bpm}");
    }

    #[test]
    fn stop_command_reports_false() {
        let mut session = Session::new(&quiet_config());
        assert!(session.apply(Command::Event(InteractionEvent::PointerUp)));
        assert!(!session.apply(Command::Stop));
    }
}
