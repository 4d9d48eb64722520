//! Ingestion loop: transcripts in, command chains out
//!
//! The loop polls a [`TranscriptSource`] at a fixed rate and never waits on
//! the vehicle. An idle utterance becomes a chain on its own task; while a
//! chain runs, utterances are only scanned for an immediate STOP.

use crate::orchestrator::{ChainOutcome, ChainRunner, PowerControl};
use crate::session::Session;
use intent_parser::{CommandType, UtteranceParser};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use voice_local::TranscriptSource;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A chain requested power-off; cleanup and power-off have run
    Shutdown,
    /// The source can produce nothing more and the last chain finished
    SourceExhausted,
    /// The caller's interrupt fired; the running chain was stopped and
    /// drained before cleanup
    Interrupted,
}

pub struct CommandLoop<S> {
    source: S,
    parser: UtteranceParser,
    runner: Arc<ChainRunner>,
    session: Arc<Session>,
    power: Arc<dyn PowerControl>,
    poll_interval: Duration,
    current: Option<JoinHandle<ChainOutcome>>,
}

impl<S: TranscriptSource> CommandLoop<S> {
    pub fn new(
        source: S,
        parser: UtteranceParser,
        runner: Arc<ChainRunner>,
        session: Arc<Session>,
        power: Arc<dyn PowerControl>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            parser,
            runner,
            session,
            power,
            poll_interval,
            current: None,
        }
    }

    pub async fn run(self) -> LoopExit {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but also ends when `interrupt` completes.
    ///
    /// On interrupt the running chain is asked to stop and awaited, so
    /// cleanup never talks to the vehicle while a chain still does.
    pub async fn run_until<F>(mut self, interrupt: F) -> LoopExit
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::pin!(interrupt);

        let exit = loop {
            if *shutdown_rx.borrow() {
                break LoopExit::Shutdown;
            }

            match self.source.poll() {
                Some(transcript) => self.handle_utterance(&transcript.text, &shutdown_tx),
                None if self.source.is_exhausted() => {
                    break match self.wait_for_chain().await {
                        Some(ChainOutcome::ShutdownRequested) => LoopExit::Shutdown,
                        _ => LoopExit::SourceExhausted,
                    };
                }
                None => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown_rx.changed() => {}
                _ = &mut interrupt => break LoopExit::Interrupted,
            }
        };

        match exit {
            LoopExit::Interrupted => {
                if self.current.is_some() {
                    info!("Stopping the running command chain before cleanup.");
                    self.runner.flags().request_stop();
                }
                self.wait_for_chain().await;
            }
            // Let the requesting chain release its slot before tearing down.
            LoopExit::Shutdown => {
                self.wait_for_chain().await;
            }
            LoopExit::SourceExhausted => {}
        }
        self.session.cleanup().await;
        if exit == LoopExit::Shutdown {
            if let Err(e) = self.power.power_off().await {
                error!("Failed to power off: {:#}", e);
            }
        }
        exit
    }

    fn handle_utterance(&mut self, text: &str, shutdown_tx: &watch::Sender<bool>) {
        info!("Recognized: '{}'", text);

        let commands = self.parser.parse(text);
        if commands.is_empty() {
            info!("No valid commands found in: '{}'", text);
            return;
        }

        let Some(guard) = self.runner.claim() else {
            if commands[0].command == CommandType::Stop {
                info!("STOP command received. Interrupting current operation.");
                self.runner.flags().request_stop();
            } else {
                debug!("Chain in progress, ignoring '{}'", text);
            }
            return;
        };

        let runner = self.runner.clone();
        let shutdown_tx = shutdown_tx.clone();
        self.current = Some(tokio::spawn(async move {
            let outcome = runner.run_claimed(guard, commands).await;
            if outcome == ChainOutcome::ShutdownRequested {
                let _ = shutdown_tx.send(true);
            }
            outcome
        }));
    }

    async fn wait_for_chain(&mut self) -> Option<ChainOutcome> {
        let handle = self.current.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Command chain task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::executor::CommandExecutor;
    use crate::state::{ExecutionFlags, VehicleState};
    use crate::{FlightConfig, SimVehicle, VehicleCall};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voice_local::ScriptedTranscript;

    #[derive(Default)]
    struct CountingPower {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PowerControl for CountingPower {
        async fn power_off(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        sim: Arc<SimVehicle>,
        runner: Arc<ChainRunner>,
        power: Arc<CountingPower>,
    }

    fn fast_config() -> FlightConfig {
        let mut config = FlightConfig::default();
        config.timeouts.action = Duration::from_millis(40);
        config.timeouts.offboard = Duration::from_millis(40);
        config.timeouts.telemetry = Duration::from_millis(40);
        config.motion.offboard_settle = Duration::from_millis(1);
        config.motion.interrupt_poll_interval = Duration::from_millis(1);
        config.motion.interrupt_poll_count = 2;
        config.poll_interval = Duration::from_millis(5);
        config
    }

    fn build(
        sim: SimVehicle,
        script: ScriptedTranscript,
        config: FlightConfig,
    ) -> (Harness, CommandLoop<ScriptedTranscript>) {
        let sim = Arc::new(sim);
        let state = Arc::new(VehicleState::with_vehicle(sim.clone()));
        let executor =
            CommandExecutor::new(state.clone(), Arc::new(ExecutionFlags::new()), &config);
        let runner = Arc::new(ChainRunner::new(executor));
        let session = Arc::new(Session::new(state, config.clone()));
        let power = Arc::new(CountingPower::default());

        let command_loop = CommandLoop::new(
            script,
            UtteranceParser::new().unwrap(),
            runner.clone(),
            session,
            power.clone(),
            config.poll_interval,
        );
        (Harness { sim, runner, power }, command_loop)
    }

    #[tokio::test]
    async fn runs_script_to_exhaustion() {
        let script = ScriptedTranscript::new()
            .say("arm")
            .silence(5)
            .say("take off three meters")
            .silence(5)
            .say("go forward two meters then turn right")
            .silence(5)
            .say("hello there")
            .silence(5)
            .say("land");
        let (h, command_loop) = build(SimVehicle::grounded(), script, fast_config());

        let exit = command_loop.run().await;
        assert_eq!(exit, LoopExit::SourceExhausted);
        assert!(h.sim.is_armed());
        assert!(!h.sim.is_in_air());
        assert_eq!(h.sim.current_heading(), 90.0);
        assert!((h.sim.current_position().north_m - 2.0).abs() < 1e-9);
        assert_eq!(h.power.calls.load(Ordering::SeqCst), 0);
        assert!(!h.runner.flags().is_executing());
        assert!(!h.runner.executor().state().snapshot().has_handle);
    }

    #[tokio::test]
    async fn stop_while_busy_interrupts_without_new_chain() {
        let mut config = fast_config();
        config.motion.interrupt_poll_interval = Duration::from_millis(20);
        config.motion.interrupt_poll_count = 50;
        let script = ScriptedTranscript::new()
            .say("up one meter, up one meter, up one meter")
            .silence(4)
            .say("land")
            .say("stop");
        let (h, command_loop) = build(SimVehicle::airborne(), script, config);

        let exit = command_loop.run().await;
        assert_eq!(exit, LoopExit::SourceExhausted);

        let calls = h.sim.calls();
        // "land" arrived mid-chain and was dropped, not queued.
        assert!(!calls.contains(&VehicleCall::Land));
        // Only the first step ran; STOP was a signal, not a hold command.
        assert!(!calls.contains(&VehicleCall::Hold));
        let setpoints = calls
            .iter()
            .filter(|c| matches!(c, VehicleCall::SetPosition(_)))
            .count();
        assert_eq!(setpoints, 2);
        assert!(!h.runner.flags().stop_requested());
    }

    #[tokio::test]
    async fn interrupt_drains_running_chain_before_cleanup() {
        let mut config = fast_config();
        config.motion.interrupt_poll_interval = Duration::from_millis(20);
        config.motion.interrupt_poll_count = 50;
        let script = ScriptedTranscript::new()
            .say("up one meter, up one meter, up one meter")
            .silence(10_000);
        let (h, command_loop) = build(SimVehicle::airborne(), script, config);

        let exit = command_loop
            .run_until(tokio::time::sleep(Duration::from_millis(60)))
            .await;
        assert_eq!(exit, LoopExit::Interrupted);

        let calls = h.sim.calls();
        // The chain stopped after its first step, and cleanup's offboard stop
        // came after the chain's last setpoint.
        let setpoints = calls
            .iter()
            .filter(|c| matches!(c, VehicleCall::SetPosition(_)))
            .count();
        assert_eq!(setpoints, 2);
        assert_eq!(calls.last(), Some(&VehicleCall::StopOffboard));
        assert!(!h.runner.flags().is_executing());
        assert!(!h.runner.flags().stop_requested());
        assert!(!h.runner.executor().state().snapshot().has_handle);
        assert_eq!(h.power.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn interrupt_while_idle_just_cleans_up() {
        let script = ScriptedTranscript::new().silence(10_000);
        let (h, command_loop) = build(SimVehicle::airborne(), script, fast_config());

        let exit = command_loop
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert_eq!(exit, LoopExit::Interrupted);
        assert!(h.sim.calls().is_empty());
    }

    #[tokio::test]
    async fn power_off_runs_after_cleanup() {
        let script = ScriptedTranscript::new()
            .say("arm")
            .silence(3)
            .say("shutdown")
            .silence(50)
            .say("arm");
        let (h, command_loop) = build(SimVehicle::grounded(), script, fast_config());

        let exit = command_loop.run().await;
        assert_eq!(exit, LoopExit::Shutdown);
        assert_eq!(h.power.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.sim.calls(), vec![VehicleCall::Arm]);
        assert!(!h.runner.executor().state().snapshot().has_handle);
    }

    #[tokio::test]
    async fn shutdown_as_last_utterance_still_powers_off() {
        let script = ScriptedTranscript::new().say("power off");
        let (h, command_loop) = build(SimVehicle::grounded(), script, fast_config());

        assert_eq!(command_loop.run().await, LoopExit::Shutdown);
        assert_eq!(h.power.calls.load(Ordering::SeqCst), 1);
    }
}
