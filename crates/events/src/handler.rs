/// Execute an aggregate command in place (no IO, no persistence).
///
/// Runs the canonical event-sourced lifecycle on an in-memory aggregate:
///
/// 1. **Decide**: `aggregate.handle(command)` (pure, no mutation)
/// 2. **Evolve**: `aggregate.apply(event)` for each decided event
///
/// Useful in tests and for rehydrating a freshly placed order without a store.
/// The infra `CommandDispatcher` adds persistence, optimistic concurrency and
/// publication on top of the same two steps.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: shopkeep_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
