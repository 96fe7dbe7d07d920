use diesel::prelude::*;
use serde::Serialize;

use crate::db::schema::chat_channels;

/// A named room. Read-only from the chat core's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = chat_channels)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
    pub category: String,
    pub is_default: bool,
}

impl ChatChannel {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            is_default: false,
        }
    }

    pub fn default_channel(mut self) -> Self {
        self.is_default = true;
        self
    }
}
