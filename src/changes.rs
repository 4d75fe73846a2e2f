// Change Feed - tag based invalidation
//
// Every completed mutation publishes the tags it invalidates; views subscribe
// and refetch whatever they display when one of their tags goes by.

use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Cases,
    Contacts(String),
    Documents(String),
    DocumentStages,
    DocumentTypes,
}

impl Tag {
    /// Whether a view of `case_id`'s document board has to refetch
    pub fn affects_board(&self, case_id: &str) -> bool {
        match self {
            Tag::Documents(id) => id == case_id,
            Tag::DocumentStages | Tag::DocumentTypes => true,
            Tag::Cases | Tag::Contacts(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Tag>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed { tx }
    }

    pub fn publish(&self, tag: Tag) {
        tracing::debug!(?tag, "invalidate");
        // No subscribers is fine: nothing is cached anywhere yet
        let _ = self.tx.send(tag);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// What a subscriber learns when it drains its queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Tags(Vec<Tag>),
    /// The subscriber fell behind; assume everything changed
    Everything,
}

impl Invalidation {
    pub fn affects_board(&self, case_id: &str) -> bool {
        match self {
            Invalidation::Tags(tags) => tags.iter().any(|t| t.affects_board(case_id)),
            Invalidation::Everything => true,
        }
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<Tag>,
}

impl Subscription {
    /// Drain pending invalidations without blocking
    pub fn drain(&mut self) -> Invalidation {
        use broadcast::error::TryRecvError;

        let mut tags = Vec::new();
        let mut lagged = false;
        loop {
            match self.rx.try_recv() {
                Ok(tag) => {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
                Err(TryRecvError::Lagged(_)) => lagged = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if lagged {
            Invalidation::Everything
        } else {
            Invalidation::Tags(tags)
        }
    }
}
