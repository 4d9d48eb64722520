//! Runs a parsed command chain step by step, one chain at a time

use crate::executor::{log_failure, CommandExecutor, CommandOutcome};
use crate::state::ExecutionFlags;
use async_trait::async_trait;
use intent_parser::ParsedCommand;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Terminal state of one chain run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed,
    /// A stop request cut the chain short
    Interrupted,
    /// A step asked to power off; remaining steps were not run
    ShutdownRequested,
}

/// Turns off the host once the session has been cleaned up.
#[async_trait]
pub trait PowerControl: Send + Sync {
    async fn power_off(&self) -> anyhow::Result<()>;
}

/// Power-off that only records the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyPower;

#[async_trait]
impl PowerControl for LogOnlyPower {
    async fn power_off(&self) -> anyhow::Result<()> {
        info!("Power-off requested; host shutdown is disabled for this run");
        Ok(())
    }
}

/// Holds the executing flag for one chain and releases it on drop, so the
/// flags are reset however the chain ends.
pub struct ChainGuard {
    flags: Arc<ExecutionFlags>,
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        self.flags.finish();
    }
}

pub struct ChainRunner {
    executor: CommandExecutor,
}

impl ChainRunner {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn flags(&self) -> &Arc<ExecutionFlags> {
        self.executor.flags()
    }

    /// Claim the chain slot. `None` while another chain holds it.
    pub fn claim(&self) -> Option<ChainGuard> {
        let flags = self.flags().clone();
        flags.try_begin().then(|| ChainGuard { flags })
    }

    /// Claim the slot and run `commands`, or return `None` if busy.
    pub async fn run(&self, commands: Vec<ParsedCommand>) -> Option<ChainOutcome> {
        let guard = self.claim()?;
        Some(self.run_claimed(guard, commands).await)
    }

    /// Run `commands` in order under an already claimed slot.
    pub async fn run_claimed(&self, guard: ChainGuard, commands: Vec<ParsedCommand>) -> ChainOutcome {
        let chain_id = Uuid::new_v4();
        let span = info_span!("chain", id = %chain_id, steps = commands.len());
        let outcome = self.run_steps(&commands).instrument(span).await;
        drop(guard);
        outcome
    }

    async fn run_steps(&self, commands: &[ParsedCommand]) -> ChainOutcome {
        let sequential = commands.len() > 1;
        if sequential {
            info!("Executing {} sequential commands:", commands.len());
        }

        let mut interrupted = false;
        for (i, cmd) in commands.iter().enumerate() {
            if sequential && self.flags().stop_requested() {
                info!("Command chain interrupted by STOP command!");
                return ChainOutcome::Interrupted;
            }
            debug!("Step {}: {}", i + 1, cmd);

            match self.executor.execute(cmd).await {
                Ok(CommandOutcome::Completed) => {}
                Ok(CommandOutcome::Skipped) | Ok(CommandOutcome::Interrupted) => interrupted = true,
                Ok(CommandOutcome::Shutdown) => {
                    info!("Shutdown command received. Cleaning up and powering off...");
                    return ChainOutcome::ShutdownRequested;
                }
                Err(e) => log_failure(cmd, &e),
            }
        }

        if interrupted {
            ChainOutcome::Interrupted
        } else {
            ChainOutcome::Completed
        }
    }
}
