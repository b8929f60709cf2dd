//! Context assembly from retrieved cases

use crate::models::ReplyOwner;
use crate::rag::CaseMatch;
use crate::text::strip_html;

/// Fixed preamble ahead of the rendered cases
const CONTEXT_PREAMBLE: &str = "以下是相关的历史客服案例供参考:\n\n";

/// Category marker for tickets without one
const UNCATEGORIZED: &str = "未分类";

/// Renders an ordered sequence of retrieved cases into one plain-text
/// context block. The assembler never re-ranks: output order is input
/// order, one 1-based case label per match.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Render matches into a context block; empty input yields the empty
    /// string, which callers must treat as "nothing to inject".
    #[must_use]
    pub fn format_as_context(&self, matches: &[CaseMatch]) -> String {
        if matches.is_empty() {
            return String::new();
        }

        let mut context = String::from(CONTEXT_PREAMBLE);

        for (idx, case) in matches.iter().enumerate() {
            context.push_str(&format!("【案例{}】\n", idx + 1));

            match case {
                CaseMatch::Ticket(ticket) => self.render_ticket(&mut context, ticket),
                CaseMatch::Document(document) => {
                    context.push_str(&document.content);
                    context.push('\n');
                }
            }

            context.push('\n');
        }

        context
    }

    fn render_ticket(&self, context: &mut String, ticket: &crate::models::TicketWithReplies) {
        let category = ticket.ticket.category.as_deref().unwrap_or(UNCATEGORIZED);
        context.push_str(&format!("分类: {category}\n"));
        context.push_str(&format!("问题: {}\n", ticket.ticket.title));

        if let Some(description) = ticket.ticket.description.as_deref() {
            if !description.is_empty() {
                context.push_str(&format!("描述: {}\n", strip_html(description)));
            }
        }

        if !ticket.replies.is_empty() {
            context.push_str("对话记录:\n");
            for reply in &ticket.replies {
                let speaker = reply.role().map_or("客服", ReplyOwner::speaker_label);
                context.push_str(&format!("{speaker}: {}\n", strip_html(&reply.content)));
            }
        }
    }
}
