//! Single-capacity resource with a first-come, first-served wait queue.
//!
//! Every requester is issued a ticket on its first request. The ticket is
//! kept until the resource is granted, so a process that temporarily drops
//! out of the queue (interrupted, or a race lost to its timeout) goes back to
//! the same position when it requests again.

use super::SimError;
use super::process::ProcessId;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) usize);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Granted,
    Queued,
}

#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    name: String,
    held_by: Option<ProcessId>,
    // sorted by ticket
    waiters: Vec<(u64, ProcessId)>,
    tickets: HashMap<ProcessId, u64>,
    next_ticket: u64,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            held_by: None,
            waiters: Vec::new(),
            tickets: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn held_by(&self) -> Option<ProcessId> {
        self.held_by
    }

    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_queued(&self, pid: ProcessId) -> bool {
        self.waiters.iter().any(|&(_, p)| p == pid)
    }

    /// Processes currently waiting, head first.
    pub fn waiting(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.waiters.iter().map(|&(_, p)| p)
    }

    /// Grants immediately when free, otherwise queues `pid` at its ticket position.
    pub fn request(&mut self, pid: ProcessId) -> Result<Request, SimError> {
        if self.held_by == Some(pid) {
            return Ok(Request::Granted);
        }
        if self.is_queued(pid) {
            return Err(SimError::AlreadyQueued(pid, self.id));
        }
        if self.held_by.is_none() && self.waiters.is_empty() {
            self.tickets.remove(&pid);
            self.held_by = Some(pid);
            return Ok(Request::Granted);
        }
        let next_ticket = &mut self.next_ticket;
        let ticket = *self.tickets.entry(pid).or_insert_with(|| {
            let t = *next_ticket;
            *next_ticket += 1;
            t
        });
        let at = self.waiters.partition_point(|&(t, _)| t < ticket);
        self.waiters.insert(at, (ticket, pid));
        Ok(Request::Queued)
    }

    /// Leaves the wait queue but keeps the ticket. Returns whether `pid` was queued.
    pub fn withdraw(&mut self, pid: ProcessId) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|&(_, p)| p != pid);
        before != self.waiters.len()
    }

    /// Drops every trace of `pid`: queue entry and ticket.
    pub fn forget(&mut self, pid: ProcessId) {
        self.withdraw(pid);
        self.tickets.remove(&pid);
    }

    /// Hands the resource to the head of the queue, if any, and returns it.
    pub fn release(&mut self, pid: ProcessId) -> Result<Option<ProcessId>, SimError> {
        if self.held_by != Some(pid) {
            return Err(SimError::NotHolder(pid, self.id));
        }
        if self.waiters.is_empty() {
            self.held_by = None;
            return Ok(None);
        }
        let (_, next) = self.waiters.remove(0);
        self.tickets.remove(&next);
        self.held_by = Some(next);
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dock() -> Resource {
        Resource::new(ResourceId(0), "dock")
    }

    #[test]
    fn test_grants_when_free() {
        let mut r = dock();
        assert_eq!(r.request(ProcessId(1)).unwrap(), Request::Granted);
        assert_eq!(r.held_by(), Some(ProcessId(1)));
        assert_eq!(r.request(ProcessId(2)).unwrap(), Request::Queued);
        assert_eq!(r.queue_len(), 1);
    }

    #[test]
    fn test_release_is_fcfs() {
        let mut r = dock();
        r.request(ProcessId(1)).unwrap();
        for pid in [2, 3, 4] {
            r.request(ProcessId(pid)).unwrap();
        }
        assert_eq!(r.release(ProcessId(1)).unwrap(), Some(ProcessId(2)));
        assert_eq!(r.release(ProcessId(2)).unwrap(), Some(ProcessId(3)));
        assert_eq!(r.release(ProcessId(3)).unwrap(), Some(ProcessId(4)));
        assert_eq!(r.release(ProcessId(4)).unwrap(), None);
        assert_eq!(r.held_by(), None);
    }

    #[test]
    fn test_withdrawn_process_keeps_position() {
        let mut r = dock();
        r.request(ProcessId(1)).unwrap();
        r.request(ProcessId(2)).unwrap();
        r.request(ProcessId(3)).unwrap();
        assert!(r.withdraw(ProcessId(2)));
        r.request(ProcessId(4)).unwrap();
        r.request(ProcessId(2)).unwrap();
        let order: Vec<_> = r.waiting().collect();
        assert_eq!(order, vec![ProcessId(2), ProcessId(3), ProcessId(4)]);
    }

    #[test]
    fn test_forgotten_process_goes_to_the_back() {
        let mut r = dock();
        r.request(ProcessId(1)).unwrap();
        r.request(ProcessId(2)).unwrap();
        r.request(ProcessId(3)).unwrap();
        r.forget(ProcessId(2));
        r.request(ProcessId(2)).unwrap();
        let order: Vec<_> = r.waiting().collect();
        assert_eq!(order, vec![ProcessId(3), ProcessId(2)]);
    }

    #[test]
    fn test_double_request_is_rejected() {
        let mut r = dock();
        r.request(ProcessId(1)).unwrap();
        r.request(ProcessId(2)).unwrap();
        assert!(matches!(r.request(ProcessId(2)), Err(SimError::AlreadyQueued(_, _))));
        assert_eq!(r.request(ProcessId(1)).unwrap(), Request::Granted);
    }

    #[test]
    fn test_release_by_non_holder_fails() {
        let mut r = dock();
        r.request(ProcessId(1)).unwrap();
        assert!(matches!(r.release(ProcessId(9)), Err(SimError::NotHolder(_, _))));
    }
}
