//! `gondor delete`: remove an instance.
//!
//! Confirmation is the frontend's job; this command deletes unconditionally.

use super::CommandContext;
use crate::error::GondorResult;
use crate::transport::FormFields;

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub instance_label: String,
}

impl DeleteOptions {
    pub fn new(instance_label: impl Into<String>) -> Self {
        Self {
            instance_label: instance_label.into(),
        }
    }
}

pub struct DeleteCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> DeleteCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &DeleteOptions) -> GondorResult<()> {
        let fields = FormFields::new()
            .field("site_key", &self.ctx.config().site_key)
            .field("instance_label", &options.instance_label);
        self.ctx.step("Deleting... ", || {
            self.ctx.api().post_form("delete/", &fields)?.into_success()
        })?;
        Ok(())
    }
}
