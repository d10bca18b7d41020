//! Last-writer-wins between the local and remote copies of a session.
//!
//! Copies are compared as whole sessions by their normalized timestamps.
//! Divergent answer histories are never merged: exactly one side wins.

use sudoku_types::Timestamp;

/// What the remote fetch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCopy {
    /// The request failed; nothing is known about the remote copy.
    Unreachable,
    /// The store answered and has no copy.
    Absent,
    /// The store's copy, written at this time.
    Present(Timestamp),
}

/// Outcome of comparing the two copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The remote copy is newer (or the only one): adopt its state and timer.
    AdoptRemote,
    /// The remote copy missed a write: push the local copy again.
    RepushLocal,
    /// Both copies agree closely enough; nothing to do.
    InSync,
    /// The remote store could not be reached; keep the local copy unconfirmed.
    Unconfirmed,
    /// Neither store has a copy.
    Fresh,
}

/// Decide which copy wins.
///
/// The remote store keeps whole seconds, so the local write time is
/// truncated before checking whether the remote copy fell behind.
pub fn reconcile(local: Option<Timestamp>, remote: RemoteCopy) -> Reconciliation {
    match (local, remote) {
        (_, RemoteCopy::Unreachable) => Reconciliation::Unconfirmed,
        (None, RemoteCopy::Absent) => Reconciliation::Fresh,
        (None, RemoteCopy::Present(_)) => Reconciliation::AdoptRemote,
        (Some(local), RemoteCopy::Present(remote)) if remote > local => Reconciliation::AdoptRemote,
        (Some(local), copy) => {
            let remote = match copy {
                RemoteCopy::Present(at) => at,
                _ => Timestamp::ZERO,
            };
            if remote < local.truncate_to_secs() {
                Reconciliation::RepushLocal
            } else {
                Reconciliation::InSync
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn newer_remote_wins() {
        let local = Some(ms(100_000));
        assert_eq!(
            reconcile(local, RemoteCopy::Present(Timestamp::from_secs(110))),
            Reconciliation::AdoptRemote
        );
    }

    #[test]
    fn older_remote_is_repaired() {
        let local = Some(ms(100_000));
        assert_eq!(
            reconcile(local, RemoteCopy::Present(Timestamp::from_secs(90))),
            Reconciliation::RepushLocal
        );
    }

    #[test]
    fn same_second_is_in_sync() {
        // Remote stored 100s for a local write at 100.750s.
        let local = Some(ms(100_750));
        assert_eq!(
            reconcile(local, RemoteCopy::Present(Timestamp::from_secs(100))),
            Reconciliation::InSync
        );
    }

    #[test]
    fn missing_remote_is_repushed() {
        assert_eq!(
            reconcile(Some(ms(5_000)), RemoteCopy::Absent),
            Reconciliation::RepushLocal
        );
    }

    #[test]
    fn only_remote_is_adopted() {
        assert_eq!(
            reconcile(None, RemoteCopy::Present(Timestamp::from_secs(1))),
            Reconciliation::AdoptRemote
        );
    }

    #[test]
    fn unreachable_remote_leaves_local_unconfirmed() {
        assert_eq!(
            reconcile(Some(ms(5_000)), RemoteCopy::Unreachable),
            Reconciliation::Unconfirmed
        );
        assert_eq!(reconcile(None, RemoteCopy::Unreachable), Reconciliation::Unconfirmed);
    }

    #[test]
    fn nothing_anywhere_is_fresh() {
        assert_eq!(reconcile(None, RemoteCopy::Absent), Reconciliation::Fresh);
    }
}
