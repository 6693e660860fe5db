//! Coordinator loop of a parallel build.
//!
//! Workers parse packages into their own [`Tree`] fragments and send them
//! over a channel. The coordinating thread alone owns the session tree: it
//! grafts each fragment, delivers its packages to the gate and resolves
//! whatever became ready. Closing the channel ends the build.

use std::sync::mpsc::Receiver;

use crate::error::Diagnostics;
use crate::session::Session;
use crate::tree::{NodeKind, Tree};

/// A parsed fragment whose top-level packages belong to `module`.
pub struct Delivery {
    pub module: String,
    pub fragment: Tree,
}

impl Delivery {
    pub fn new(module: impl Into<String>, fragment: Tree) -> Self {
        Self {
            module: module.into(),
            fragment,
        }
    }
}

/// Receive deliveries until every sender is gone, then finish the packages
/// still waiting. Errors of every package are returned together.
pub fn drive(session: &mut Session, deliveries: Receiver<Delivery>) -> Result<(), Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    for delivery in deliveries {
        let module = match session.builder().module(&delivery.module) {
            Ok(module) => module,
            Err(err) => {
                diagnostics.push(err);
                continue;
            }
        };
        let moved = match session.tree_mut().graft(delivery.fragment, module) {
            Ok(moved) => moved,
            Err(err) => {
                diagnostics.push(err);
                continue;
            }
        };
        tracing::debug!(module = %delivery.module, nodes = moved.len(), "fragment grafted");

        for node in moved {
            if !matches!(session.tree().kind(node), Some(NodeKind::Package { .. })) {
                continue;
            }
            if let Err(err) = session.deliver(node) {
                diagnostics.push(err);
            }
        }
        diagnostics.extend(session.release_ready());
    }

    tracing::debug!("all deliveries received");
    if let Err(errors) = session.run() {
        diagnostics.extend(errors);
    }
    diagnostics.into_result(())
}
