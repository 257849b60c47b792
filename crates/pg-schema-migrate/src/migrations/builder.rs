//! Accumulates generated SQL text into executable commands.

use serde::Serialize;

const INDENT: &str = "    ";

/// One executable unit of generated SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationCommand {
    pub command_text: String,
    /// The command must run outside of a transaction.
    pub transaction_suppressed: bool,
}

/// Position in a builder, used to discard partial output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderMark {
    commands: usize,
    text: usize,
    indent: usize,
}

/// Builds a list of [`MigrationCommand`]s.
///
/// Text is appended to the current command until
/// [`end_command`](Self::end_command) closes it. Lines appended while
/// indented are prefixed with four spaces per level.
#[derive(Debug, Default)]
pub struct MigrationCommandListBuilder {
    commands: Vec<MigrationCommand>,
    current: String,
    indent: usize,
    at_line_start: bool,
}

impl MigrationCommandListBuilder {
    pub fn new() -> Self {
        Self {
            at_line_start: true,
            ..Self::default()
        }
    }

    /// Append text to the current command.
    pub fn append(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if text.is_empty() {
            return self;
        }
        if self.at_line_start && self.indent > 0 {
            for _ in 0..self.indent {
                self.current.push_str(INDENT);
            }
        }
        self.current.push_str(text);
        self.at_line_start = false;
        self
    }

    /// Append text followed by a newline.
    pub fn append_line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.append(text);
        self.current.push('\n');
        self.at_line_start = true;
        self
    }

    pub fn increment_indent(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    pub fn decrement_indent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    /// Close the current command. Whitespace-only text produces no command.
    pub fn end_command(&mut self, suppress_transaction: bool) -> &mut Self {
        if !self.current.trim().is_empty() {
            self.commands.push(MigrationCommand {
                command_text: std::mem::take(&mut self.current),
                transaction_suppressed: suppress_transaction,
            });
        } else {
            self.current.clear();
        }
        self.at_line_start = true;
        self
    }

    /// Text appended since the last [`end_command`](Self::end_command).
    pub fn pending_text(&self) -> &str {
        &self.current
    }

    pub fn commands(&self) -> &[MigrationCommand] {
        &self.commands
    }

    /// Current position, for [`rollback`](Self::rollback).
    pub fn mark(&self) -> BuilderMark {
        BuilderMark {
            commands: self.commands.len(),
            text: self.current.len(),
            indent: self.indent,
        }
    }

    /// Drop everything appended after `mark`.
    pub fn rollback(&mut self, mark: BuilderMark) {
        if self.commands.len() > mark.commands {
            // The pending text at the mark was moved into the first new command
            let mut restored = self.commands[mark.commands].command_text.clone();
            restored.truncate(mark.text);
            self.commands.truncate(mark.commands);
            self.current = restored;
        } else {
            self.current.truncate(mark.text);
        }
        self.indent = mark.indent;
        self.at_line_start = self.current.is_empty() || self.current.ends_with('\n');
    }

    /// Finish, closing any pending text as a transactional command.
    pub fn build(mut self) -> Vec<MigrationCommand> {
        self.end_command(false);
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_split_at_end_command() {
        let mut builder = MigrationCommandListBuilder::new();
        builder.append("SELECT 1").append_line(";").end_command(false);
        builder.append_line("VACUUM;").end_command(true);

        let commands = builder.build();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command_text, "SELECT 1;\n");
        assert!(!commands[0].transaction_suppressed);
        assert!(commands[1].transaction_suppressed);
    }

    #[test]
    fn test_empty_command_is_dropped() {
        let mut builder = MigrationCommandListBuilder::new();
        builder.end_command(false);
        builder.append_line("").end_command(false);
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_indentation_applies_at_line_start() {
        let mut builder = MigrationCommandListBuilder::new();
        builder.append_line("CREATE TABLE t (");
        builder.increment_indent();
        builder.append("\"a\" ").append_line("integer,");
        builder.append_line("\"b\" text");
        builder.decrement_indent();
        builder.append(")");

        assert_eq!(
            builder.pending_text(),
            "CREATE TABLE t (\n    \"a\" integer,\n    \"b\" text\n)"
        );
    }

    #[test]
    fn test_rollback_discards_partial_output() {
        let mut builder = MigrationCommandListBuilder::new();
        builder.append_line("SELECT 1;").end_command(false);
        builder.append("SELECT ");

        let mark = builder.mark();
        builder.append_line("2;").end_command(false);
        builder.append("SELECT 3");
        builder.rollback(mark);

        assert_eq!(builder.commands().len(), 1);
        assert_eq!(builder.pending_text(), "SELECT ");
    }

    #[test]
    fn test_rollback_restores_indent() {
        let mut builder = MigrationCommandListBuilder::new();
        let mark = builder.mark();
        builder.append_line("CREATE TABLE t (").increment_indent();
        builder.append("\"id\" integer");
        builder.rollback(mark);

        builder.append_line("DROP TABLE t;");
        assert_eq!(builder.build()[0].command_text, "DROP TABLE t;\n");
    }
}
