//! Intent routing and the cyclic dialogue machine.
//!
//! A user turn enters at `classify`, which routes to one action node (or
//! the plain-response node); the node appends its result to the history
//! and transitions back to `classify`. The graph is cyclic by design — it
//! models an ongoing conversation — but one external invocation processes
//! exactly one user message: the loop stops once a full cycle completes,
//! and the caller decides whether to feed another turn.
//!
//! Classification is an ordered table of substring-pair rules, checked
//! case-insensitively against the latest message only. The first rule
//! whose both substrings are present wins; rule order is the priority
//! order. No match falls through to [`Intent::RespondPlain`] — ambiguity
//! is absorbed by the default rather than raised.

use crate::actions::ActionSet;
use crate::config::AgentConfig;
use crate::models::{DialogueState, Intent, Message};

/// Routing rules in priority order: the first pair fully contained in the
/// (lowercased) message selects the intent.
const ROUTE_RULES: [(&str, &str, Intent); 8] = [
    ("restart", "server", Intent::Restart),
    ("restart", "service", Intent::Restart),
    ("status", "server", Intent::GetStatus),
    ("status", "service", Intent::GetStatus),
    ("logs", "server", Intent::GetLogs),
    ("logs", "service", Intent::GetLogs),
    ("send", "email", Intent::SendNotification),
    ("send", "notification", Intent::SendNotification),
];

/// Fixed reply for turns that route to no action.
pub const FALLBACK_REPLY: &str = "No actions executed. You can ask me to restart a service, \
    check its status, fetch its logs, or send a notification email.";

/// Classify the latest message text into an intent.
///
/// Pure and stateless: depends only on the given text, never on earlier
/// turns. Deterministic for identical input.
pub fn classify_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    ROUTE_RULES
        .iter()
        .find(|(a, b, _)| lowered.contains(a) && lowered.contains(b))
        .map(|(_, _, intent)| *intent)
        .unwrap_or(Intent::RespondPlain)
}

/// Scan the conversation history for a resource-name token.
///
/// Messages are scanned in original order regardless of role; each is
/// split on whitespace and the first token matching the configured rule
/// wins (`keyword`: token contains the pattern; `prefix`: token starts
/// with it). Matching is case-insensitive and surrounding punctuation is
/// trimmed from the returned token. No match anywhere in the history
/// returns the configured default resource name.
///
/// This is a heuristic, not a parser: false positives are acceptable as
/// long as identical history always yields the identical name.
pub fn extract_resource(history: &[Message], config: &AgentConfig) -> String {
    let pattern = config.entity_pattern.to_lowercase();
    for message in history {
        for token in message.text.split_whitespace() {
            let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
            if trimmed.is_empty() {
                continue;
            }
            let lowered = trimmed.to_lowercase();
            let matched = match config.entity_match.as_str() {
                "prefix" => lowered.starts_with(&pattern),
                _ => lowered.contains(&pattern),
            };
            if matched {
                return trimmed.to_string();
            }
        }
    }
    config.default_resource.clone()
}

/// Nodes of the dialogue graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Classify,
    RespondPlain,
    Restart,
    GetStatus,
    GetLogs,
    SendNotification,
}

fn node_for(intent: Intent) -> Node {
    match intent {
        Intent::Restart => Node::Restart,
        Intent::GetStatus => Node::GetStatus,
        Intent::GetLogs => Node::GetLogs,
        Intent::SendNotification => Node::SendNotification,
        Intent::RespondPlain => Node::RespondPlain,
    }
}

/// The dialogue state machine.
///
/// Holds the executors and extraction settings; conversation state is
/// passed in per turn and owned exclusively by that turn.
pub struct DialogueMachine {
    actions: ActionSet,
    agent: AgentConfig,
}

impl DialogueMachine {
    pub fn new(actions: ActionSet, agent: AgentConfig) -> Self {
        Self { actions, agent }
    }

    /// Process exactly one user message: append it, run one full cycle of
    /// the graph (classify → node → classify), and return the intent that
    /// was routed. The node's result is appended to `state.history` as an
    /// assistant message before this returns.
    ///
    /// Executor failures do not abort the turn: the failure is surfaced
    /// as the assistant message and the cycle still completes.
    pub fn process_turn(&self, state: &mut DialogueState, text: &str) -> Intent {
        state.history.push(Message::user(text));

        let mut routed = Intent::RespondPlain;
        let mut node = Node::Classify;
        let mut cycled = false;

        // Explicit transition loop; recursion would grow the stack with
        // conversation length.
        loop {
            node = match node {
                Node::Classify => {
                    if cycled {
                        break;
                    }
                    let latest = state
                        .history
                        .last()
                        .map(|m| m.text.as_str())
                        .unwrap_or_default();
                    routed = classify_intent(latest);
                    state.pending_intent = Some(routed);
                    node_for(routed)
                }
                Node::RespondPlain => {
                    state.history.push(Message::assistant(FALLBACK_REPLY));
                    cycled = true;
                    Node::Classify
                }
                Node::Restart => {
                    self.run_action(state, Intent::Restart);
                    cycled = true;
                    Node::Classify
                }
                Node::GetStatus => {
                    self.run_action(state, Intent::GetStatus);
                    cycled = true;
                    Node::Classify
                }
                Node::GetLogs => {
                    self.run_action(state, Intent::GetLogs);
                    cycled = true;
                    Node::Classify
                }
                Node::SendNotification => {
                    self.run_action(state, Intent::SendNotification);
                    cycled = true;
                    Node::Classify
                }
            };
        }

        state.pending_intent = None;
        routed
    }

    /// Run one action node: extract the resource from the full history,
    /// invoke the matching executor exactly once, append its report.
    fn run_action(&self, state: &mut DialogueState, intent: Intent) {
        let resource = extract_resource(&state.history, &self.agent);
        let executor = match self.actions.for_intent(intent) {
            Some(executor) => executor,
            None => return,
        };
        let reply = match executor.execute(&resource) {
            Ok(report) => report,
            Err(e) => format!(
                "The {} action failed for {}: {}",
                intent.name(),
                resource,
                e
            ),
        };
        state.history.push(Message::assistant(reply));
    }
}
