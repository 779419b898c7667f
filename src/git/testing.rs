//! Scripted command runner for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::CommandError;
use crate::git::runner::{CommandOutput, CommandRunner};

enum Reply {
    Ok(String),
    Fail(String),
}

/// Replies to git invocations by longest matching argument prefix.
/// Unscripted invocations succeed with empty output.
///
/// Scripting the same prefix more than once queues the replies: each call
/// takes the next one and the last one repeats.
#[derive(Default)]
pub(crate) struct FakeRunner {
    replies: Vec<(String, Reply)>,
    hits: RefCell<HashMap<String, usize>>,
    calls: RefCell<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, args: &str, stdout: &str) -> Self {
        self.replies.push((args.to_string(), Reply::Ok(stdout.to_string())));
        self
    }

    pub fn fail(mut self, args: &str, stderr: &str) -> Self {
        self.replies.push((args.to_string(), Reply::Fail(stderr.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let joined = args.join(" ");
        self.calls.borrow_mut().push(joined.clone());

        let Some(longest) = self
            .replies
            .iter()
            .filter(|(prefix, _)| joined.starts_with(prefix.as_str()))
            .map(|(prefix, _)| prefix.len())
            .max()
        else {
            return Ok(CommandOutput::default());
        };

        let queue: Vec<&(String, Reply)> = self
            .replies
            .iter()
            .filter(|(prefix, _)| prefix.len() == longest && joined.starts_with(prefix.as_str()))
            .collect();
        let mut hits = self.hits.borrow_mut();
        let hit = hits.entry(queue[0].0.clone()).or_default();
        let reply = &queue[(*hit).min(queue.len() - 1)].1;
        *hit += 1;

        match reply {
            Reply::Ok(stdout) => Ok(CommandOutput::new(stdout.clone())),
            Reply::Fail(stderr) => Err(CommandError::failed(args, stderr, Some(1))),
        }
    }
}
