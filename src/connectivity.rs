use crate::{errors::MeshError, relation::RelationClass};

/// Reference to a face: the slot in the bucket of its relation class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceSlot {
    pub slot: usize,
    pub relation: RelationClass,
}

/// Contiguous range of a generator's entries in the [`ConnectivityIndex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub count: usize,
}

/// Shared, append-only record of which faces belong to which cell.
///
/// Entries are only appended between [`open_span`](Self::open_span) and
/// [`close_span`](Self::close_span), so every cell owns one contiguous span.
/// At most one span can be open at a time.
#[derive(Debug, Default)]
pub struct ConnectivityIndex {
    entries: Vec<FaceSlot>,
    spans: Vec<Option<Span>>,
    open: Option<usize>,
}

impl ConnectivityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all spans and entries, keeping the allocations.
    pub fn reset(&mut self, num_generators: usize) {
        self.entries.clear();
        self.spans.clear();
        self.spans.resize(num_generators, None);
        self.open = None;
    }

    pub fn open_span(&mut self, generator: usize) -> Result<(), MeshError> {
        if let Some(open) = self.open {
            return Err(MeshError::OverlappingSpan {
                requested: generator,
                open,
            });
        }
        if generator >= self.spans.len() {
            self.spans.resize(generator + 1, None);
        }
        self.spans[generator] = Some(Span {
            offset: self.entries.len(),
            count: 0,
        });
        self.open = Some(generator);
        Ok(())
    }

    /// Append an entry to the currently open span.
    pub fn push(&mut self, entry: FaceSlot) {
        debug_assert!(self.open.is_some(), "Connectivity entry pushed without open span");
        if let Some(span) = self.open.and_then(|g| self.spans[g].as_mut()) {
            span.count += 1;
            self.entries.push(entry);
        }
    }

    /// Close the open span, returning it.
    pub fn close_span(&mut self) -> Option<Span> {
        self.open.take().and_then(|g| self.spans[g])
    }

    pub fn open_generator(&self) -> Option<usize> {
        self.open
    }

    /// The entries of the currently open span.
    pub fn open_entries(&self) -> &[FaceSlot] {
        match self.open {
            Some(g) => self.span(g),
            None => &[],
        }
    }

    pub fn span_info(&self, generator: usize) -> Option<Span> {
        self.spans.get(generator).copied().flatten()
    }

    /// The entries of the given generator (empty if it has no span).
    pub fn span(&self, generator: usize) -> &[FaceSlot] {
        match self.span_info(generator) {
            Some(span) => &self.entries[span.offset..span.offset + span.count],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
