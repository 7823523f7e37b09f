//! Host-loop side of the bridge.
//!
//! [`HostDispatcher::tick`] is called once per host update on the host's own
//! thread. It pops at most one item and runs the matching handler against the
//! host state, so every mutation stays on that thread. Handler failures never
//! escape a tick: command failures are reported and swallowed, query failures
//! become `ERROR: <message>` results for the waiting connection.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::correlation::CorrelationTable;
use crate::queue::PendingQueue;
use crate::registry::{HandlerError, HandlerRegistry};
use crate::reporter::BridgeReporter;
use crate::wire::{PendingItem, QueryId};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    /// A command handler ran successfully.
    CommandApplied { verb: String },
    /// A command handler failed; the failure was reported.
    CommandFailed { verb: String, message: String },
    /// No handler is registered for the command verb.
    CommandDropped { verb: String },
    /// A query result (possibly an `ERROR:` text) was published.
    QueryAnswered {
        id: QueryId,
        verb: String,
        /// False when the waiter had already timed out.
        delivered: bool,
    },
}

/// Drains the pending queue into a host's handler registry.
pub struct HostDispatcher<H> {
    queue: Arc<PendingQueue>,
    table: Arc<CorrelationTable>,
    registry: HandlerRegistry<H>,
    reporter: Arc<dyn BridgeReporter>,
}

impl<H> HostDispatcher<H> {
    /// Creates a dispatcher sharing the bridge's queue and correlation table.
    pub fn new(
        queue: Arc<PendingQueue>,
        table: Arc<CorrelationTable>,
        registry: HandlerRegistry<H>,
        reporter: Arc<dyn BridgeReporter>,
    ) -> Self {
        Self {
            queue,
            table,
            registry,
            reporter,
        }
    }

    /// Handler registry in use.
    pub fn registry(&self) -> &HandlerRegistry<H> {
        &self.registry
    }

    /// Processes at most one pending item against `host`.
    ///
    /// Never blocks: an empty queue yields [`TickOutcome::Idle`].
    pub fn tick(&self, host: &mut H) -> TickOutcome {
        match self.queue.try_dequeue() {
            None => TickOutcome::Idle,
            Some(item) => self.process(host, item),
        }
    }

    fn process(&self, host: &mut H, item: PendingItem) -> TickOutcome {
        match item {
            PendingItem::Command { ref verb, ref payload } => {
                let Some(handler) = self.registry.command(verb) else {
                    self.reporter.verb_dropped(&item);
                    return TickOutcome::CommandDropped { verb: verb.clone() };
                };
                match guarded(|| handler(host, payload.as_str())) {
                    Ok(()) => TickOutcome::CommandApplied { verb: verb.clone() },
                    Err(error) => {
                        self.reporter.command_failed(verb, &error);
                        TickOutcome::CommandFailed {
                            verb: verb.clone(),
                            message: error.message().to_owned(),
                        }
                    }
                }
            }
            PendingItem::Query { id, verb, payload } => {
                let text = match self.registry.query(&verb) {
                    None => format!("ERROR: Unknown query type: {verb}"),
                    Some(handler) => match guarded(|| handler(host, payload.as_str())) {
                        Ok(result) => result,
                        Err(error) => format!("ERROR: {error}"),
                    },
                };
                let delivered = self.table.set_result(id, text);
                TickOutcome::QueryAnswered {
                    id,
                    verb,
                    delivered,
                }
            }
        }
    }
}

/// Runs a handler, converting a panic into a [`HandlerError`].
fn guarded<T>(call: impl FnOnce() -> Result<T, HandlerError>) -> Result<T, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(HandlerError::new(format!(
            "handler panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::correlation::WaitHandle;
    use crate::reporter::StructuredReporter;

    #[derive(Default)]
    struct Lamp {
        on: bool,
    }

    struct Harness {
        queue: Arc<PendingQueue>,
        table: Arc<CorrelationTable>,
        dispatcher: HostDispatcher<Lamp>,
    }

    #[fixture]
    fn harness() -> Harness {
        let queue = Arc::new(PendingQueue::new());
        let table = Arc::new(CorrelationTable::new());
        let registry = HandlerRegistry::builder()
            .command("toggle", |lamp: &mut Lamp, _| {
                lamp.on = !lamp.on;
                Ok(())
            })
            .and_then(|builder| {
                builder.command("explode", |_: &mut Lamp, _| panic!("bulb burst"))
            })
            .and_then(|builder| {
                builder.query("state", |lamp: &mut Lamp, _| {
                    Ok(if lamp.on { "on" } else { "off" }.to_owned())
                })
            })
            .and_then(|builder| {
                builder.query("fail", |_: &mut Lamp, payload| {
                    Err(HandlerError::new(format!("cannot read {payload}")))
                })
            })
            .expect("distinct verbs")
            .build();
        let dispatcher = HostDispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&table),
            registry,
            Arc::new(StructuredReporter::new()),
        );
        Harness {
            queue,
            table,
            dispatcher,
        }
    }

    fn ask(harness: &Harness, verb: &str, payload: &str) -> (QueryId, Arc<WaitHandle>) {
        let id = harness.table.next_id();
        let handle = harness.table.register(id).expect("register query");
        harness.queue.enqueue(PendingItem::query(id, verb, payload));
        (id, handle)
    }

    #[rstest]
    fn empty_queue_is_idle(harness: Harness) {
        let mut lamp = Lamp::default();
        assert_eq!(harness.dispatcher.tick(&mut lamp), TickOutcome::Idle);
    }

    #[rstest]
    fn processes_one_item_per_tick(harness: Harness) {
        let mut lamp = Lamp::default();
        harness.queue.enqueue(PendingItem::command("toggle", ""));
        harness.queue.enqueue(PendingItem::command("toggle", ""));

        harness.dispatcher.tick(&mut lamp);
        assert!(lamp.on);
        assert_eq!(harness.queue.len(), 1);
        harness.dispatcher.tick(&mut lamp);
        assert!(!lamp.on);
        assert!(harness.queue.is_empty());
    }

    #[rstest]
    fn unknown_command_is_dropped(harness: Harness) {
        let mut lamp = Lamp::default();
        harness.queue.enqueue(PendingItem::command("dim", "50"));
        assert_eq!(
            harness.dispatcher.tick(&mut lamp),
            TickOutcome::CommandDropped {
                verb: "dim".to_owned()
            }
        );
    }

    #[rstest]
    fn panicking_command_is_contained(harness: Harness) {
        let mut lamp = Lamp::default();
        harness.queue.enqueue(PendingItem::command("explode", ""));
        let outcome = harness.dispatcher.tick(&mut lamp);
        assert_eq!(
            outcome,
            TickOutcome::CommandFailed {
                verb: "explode".to_owned(),
                message: "handler panicked: bulb burst".to_owned(),
            }
        );
    }

    #[rstest]
    fn query_result_reaches_waiter(harness: Harness) {
        let mut lamp = Lamp { on: true };
        let (id, handle) = ask(&harness, "state", "");

        let outcome = harness.dispatcher.tick(&mut lamp);
        assert!(matches!(
            outcome,
            TickOutcome::QueryAnswered { delivered: true, .. }
        ));
        assert!(handle.wait(Duration::from_millis(10)));
        assert_eq!(harness.table.take(id).as_deref(), Some("on"));
    }

    #[rstest]
    #[case("fail", "main", "ERROR: cannot read main")]
    #[case("teleport", "", "ERROR: Unknown query type: teleport")]
    fn query_failures_are_delivered_as_error_text(
        harness: Harness,
        #[case] verb: &str,
        #[case] payload: &str,
        #[case] expected: &str,
    ) {
        let mut lamp = Lamp::default();
        let (id, _handle) = ask(&harness, verb, payload);
        harness.dispatcher.tick(&mut lamp);
        assert_eq!(harness.table.take(id).as_deref(), Some(expected));
    }

    #[rstest]
    fn result_for_abandoned_query_is_not_delivered(harness: Harness) {
        let mut lamp = Lamp::default();
        let (id, _handle) = ask(&harness, "state", "");
        assert!(harness.table.abandon(id));

        let outcome = harness.dispatcher.tick(&mut lamp);
        assert_eq!(
            outcome,
            TickOutcome::QueryAnswered {
                id,
                verb: "state".to_owned(),
                delivered: false,
            }
        );
        assert!(harness.table.is_empty());
    }

    #[derive(Default)]
    struct Journal {
        marks: Vec<u64>,
    }

    #[rstest]
    fn host_applies_commands_in_global_enqueue_order() {
        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 50;

        let queue = Arc::new(PendingQueue::new());
        let registry = HandlerRegistry::builder()
            .command("mark", |journal: &mut Journal, payload| {
                let mark = payload
                    .parse::<u64>()
                    .map_err(|error| HandlerError::new(format!("bad mark {payload}: {error}")))?;
                journal.marks.push(mark);
                Ok(())
            })
            .expect("single verb")
            .build();
        let dispatcher = HostDispatcher::new(
            Arc::clone(&queue),
            Arc::new(CorrelationTable::new()),
            registry,
            Arc::new(StructuredReporter::new()),
        );

        // The sequence number is taken under the same lock as the enqueue,
        // so its order is the order items entered the queue.
        let sequence = Arc::new(Mutex::new(0_u64));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let sequence = Arc::clone(&sequence);
                thread::spawn(move || {
                    for _ in 0..PER_PRODUCER {
                        let mut next = sequence.lock().expect("sequence lock");
                        queue.enqueue(PendingItem::command("mark", next.to_string()));
                        *next += 1;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer thread");
        }

        let mut journal = Journal::default();
        while dispatcher.tick(&mut journal) != TickOutcome::Idle {}

        let expected: Vec<u64> = (0..PRODUCERS * PER_PRODUCER).collect();
        assert_eq!(journal.marks, expected);
    }
}
