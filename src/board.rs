// 📋 Board View - stages as columns, documents as draggable cards
//
// Projection rules:
// - stage columns follow display order (stable sort by `order`)
// - the "Unassigned" column comes first and only exists while it holds cards
// - a document whose stage is missing from the stage list counts as unassigned
//
// Drag interaction: Idle -> Dragging{document, origin} -> Idle
// A drop over a column on the board yields a MoveRequest; a drop anywhere
// else or a cancel yields nothing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::entities::document::{Document, StageTarget};
use crate::entities::stage::Stage;
use crate::movement::MoveRequest;

pub const UNASSIGNED_TITLE: &str = "Unassigned";

// ============================================================================
// PROJECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub document_id: String,
    pub name: String,
    pub type_name: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub history_len: usize,
    /// Rendered dimmed in its origin slot while being dragged
    pub dragging: bool,
}

impl From<&Document> for Card {
    fn from(doc: &Document) -> Self {
        Card {
            document_id: doc.id.clone(),
            name: doc.name.clone(),
            type_name: doc.type_name().map(str::to_string),
            updated_at: doc.updated_at,
            history_len: doc.history.len(),
            dragging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// None for the unassigned column
    pub stage_id: Option<String>,
    pub title: String,
    pub count: usize,
    pub cards: Vec<Card>,
}

impl Column {
    pub fn key(&self) -> StageTarget {
        StageTarget::from_wire(self.stage_id.as_deref())
    }

    pub fn is_unassigned(&self) -> bool {
        self.stage_id.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    pub fn build(stages: &[Stage], documents: &[Document]) -> Self {
        let mut ordered: Vec<&Stage> = stages.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let known: HashSet<&str> = ordered.iter().map(|s| s.id.as_str()).collect();

        let unassigned: Vec<Card> = documents
            .iter()
            .filter(|d| d.stage_id().map_or(true, |id| !known.contains(id)))
            .map(Card::from)
            .collect();

        let mut columns = Vec::with_capacity(ordered.len() + 1);
        if !unassigned.is_empty() {
            columns.push(Column {
                stage_id: None,
                title: UNASSIGNED_TITLE.to_string(),
                count: unassigned.len(),
                cards: unassigned,
            });
        }

        for stage in ordered {
            let cards: Vec<Card> = documents
                .iter()
                .filter(|d| d.stage_id() == Some(stage.id.as_str()))
                .map(Card::from)
                .collect();
            columns.push(Column {
                stage_id: Some(stage.id.clone()),
                title: stage.name.clone(),
                count: cards.len(),
                cards,
            });
        }

        Board { columns }
    }

    pub fn column(&self, key: &StageTarget) -> Option<&Column> {
        self.columns.iter().find(|c| &c.key() == key)
    }

    pub fn has_column(&self, key: &StageTarget) -> bool {
        self.column(key).is_some()
    }

    /// (column index, card index) of a document
    pub fn locate(&self, document_id: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, column)| {
            column
                .cards
                .iter()
                .position(|card| card.document_id == document_id)
                .map(|pos| (ci, pos))
        })
    }

    pub fn column_of(&self, document_id: &str) -> Option<StageTarget> {
        self.locate(document_id)
            .map(|(ci, _)| self.columns[ci].key())
    }

    pub fn card(&self, document_id: &str) -> Option<&Card> {
        self.locate(document_id)
            .map(|(ci, pos)| &self.columns[ci].cards[pos])
    }

    pub fn total_cards(&self) -> usize {
        self.columns.iter().map(|c| c.count).sum()
    }

    /// Flag the card currently being dragged
    pub fn mark_dragging(&mut self, drag: &DragState) {
        for column in &mut self.columns {
            for card in &mut column.cards {
                card.dragging = drag.is_dragging(&card.document_id);
            }
        }
    }
}

/// One line of the "Movement History" dialog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub label: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// History of a document, newest first
pub fn history_view(document: &Document) -> Vec<HistoryEntry> {
    document
        .history
        .iter()
        .rev()
        .map(|record| HistoryEntry {
            label: record.label().to_string(),
            date: record.date,
            notes: record.notes.clone(),
        })
        .collect()
}

// ============================================================================
// DRAG STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        document_id: String,
        origin: StageTarget,
    },
}

/// Where the pointer was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Column(StageTarget),
    Outside,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragError {
    #[error("a drag is already in progress for document {0}")]
    AlreadyDragging(String),

    #[error("document {0} is not on the board")]
    UnknownCard(String),
}

impl DragState {
    pub fn begin(&mut self, board: &Board, document_id: &str) -> Result<(), DragError> {
        if let DragState::Dragging { document_id, .. } = self {
            return Err(DragError::AlreadyDragging(document_id.clone()));
        }

        let origin = board
            .column_of(document_id)
            .ok_or_else(|| DragError::UnknownCard(document_id.to_string()))?;

        *self = DragState::Dragging {
            document_id: document_id.to_string(),
            origin,
        };
        Ok(())
    }

    /// Release the card. Returns the move to perform, if any; always ends Idle.
    pub fn drop_on(&mut self, board: &Board, target: DropTarget) -> Option<MoveRequest> {
        let DragState::Dragging { document_id, .. } = std::mem::take(self) else {
            return None;
        };

        match target {
            DropTarget::Outside => None,
            DropTarget::Column(key) => {
                let accepted = key == StageTarget::Unassigned || board.has_column(&key);
                accepted.then(|| MoveRequest::new(document_id, key))
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = DragState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    pub fn dragged_document(&self) -> Option<&str> {
        match self {
            DragState::Dragging { document_id, .. } => Some(document_id),
            DragState::Idle => None,
        }
    }

    pub fn origin(&self) -> Option<&StageTarget> {
        match self {
            DragState::Dragging { origin, .. } => Some(origin),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self, document_id: &str) -> bool {
        self.dragged_document() == Some(document_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
