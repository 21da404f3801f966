//! Canned message catalog and the selection cursor over it.

use core::fmt;

use crate::ui::input_logic::{wrap_next, wrap_prev};

/// Catalog construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CatalogError {
    /// A catalog needs at least one message.
    Empty,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => f.write_str("message catalog is empty"),
        }
    }
}

/// Ordered, non-empty, immutable list of messages.
#[derive(Debug, Clone, Copy)]
pub struct MessageCatalog<'a> {
    messages: &'a [&'a str],
}

impl<'a> MessageCatalog<'a> {
    pub fn new(messages: &'a [&'a str]) -> Result<Self, CatalogError> {
        if messages.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { messages })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.messages.get(index).copied()
    }
}

/// Selected position in a [`MessageCatalog`]. Wraps in both directions.
#[derive(Debug, Clone)]
pub struct MessageCycle<'a> {
    catalog: MessageCatalog<'a>,
    index: usize,
}

impl<'a> MessageCycle<'a> {
    /// Starts at the first message.
    pub fn new(catalog: MessageCatalog<'a>) -> Self {
        Self { catalog, index: 0 }
    }

    pub fn advance(&mut self) {
        self.index = wrap_next(self.index, self.catalog.len());
    }

    pub fn retreat(&mut self) {
        self.index = wrap_prev(self.index, self.catalog.len());
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &'a str {
        // index < len is maintained by the wrap helpers; len >= 1 by construction
        self.catalog.messages[self.index]
    }

    pub fn catalog(&self) -> &MessageCatalog<'a> {
        &self.catalog
    }
}
