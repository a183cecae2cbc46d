//! Incremental transcript printing.
//!
//! Snapshots always carry the full turn lists; the renderer remembers how
//! much of each turn it already printed and writes only the new text. A
//! header line is printed whenever output switches to another turn or
//! channel, so two interleaved debaters stay readable.

use std::fmt::Write as _;
use std::io::Write;

use console::style;

use colloquy_types::snapshot::SessionSnapshot;

/// Position of the text printed last: (channel, turn).
type Cursor = (usize, usize);

#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    /// Per channel: bytes already printed for each turn.
    printed: Vec<Vec<usize>>,
    last: Option<Cursor>,
    multi_channel: bool,
}

impl TranscriptRenderer {
    pub fn new(channel_count: usize) -> Self {
        Self {
            printed: vec![Vec::new(); channel_count],
            last: None,
            multi_channel: channel_count > 1,
        }
    }

    /// Text that `snapshot` adds on top of what was already rendered.
    pub fn delta(&mut self, snapshot: &SessionSnapshot) -> String {
        let mut out = String::new();
        for (ch, channel) in snapshot.channels.iter().enumerate() {
            if ch >= self.printed.len() {
                self.printed.resize(ch + 1, Vec::new());
            }
            // A new submit cleared the turns; start over for this channel.
            if channel.turns.len() < self.printed[ch].len() {
                self.printed[ch].clear();
            }

            for (index, turn) in channel.turns.iter().enumerate() {
                if index == self.printed[ch].len() {
                    self.printed[ch].push(0);
                }
                let done = self.printed[ch][index];
                if turn.text.len() <= done {
                    continue;
                }
                if self.last != Some((ch, index)) {
                    if self.last.is_some() {
                        out.push_str("\n\n");
                    }
                    let header = if self.multi_channel {
                        format!("[ch{ch}] {}", turn.speaker_label())
                    } else {
                        turn.speaker_label().to_string()
                    };
                    let _ = writeln!(out, "{}", style(header).cyan().bold());
                    self.last = Some((ch, index));
                }
                out.push_str(turn.text.get(done..).unwrap_or(&turn.text));
                self.printed[ch][index] = turn.text.len();
            }
        }
        out
    }

    /// Print the delta for `snapshot` to stdout.
    pub fn render(&mut self, snapshot: &SessionSnapshot) {
        let delta = self.delta(snapshot);
        if delta.is_empty() {
            return;
        }
        print!("{delta}");
        let _ = std::io::stdout().flush();
    }

    /// Closing status line after the session settles.
    pub fn print_footer(&self, snapshot: &SessionSnapshot) {
        println!();
        println!();
        println!("{}", status_line(snapshot));
    }
}

fn status_line(snapshot: &SessionSnapshot) -> String {
    let turns: usize = snapshot.channels.iter().map(|c| c.turns.len()).sum();
    if snapshot.disconnected {
        format!(
            "  {} Disconnected: a backend stopped responding ({turns} turns received)",
            style("✗").red()
        )
    } else if snapshot.interrupted {
        format!(
            "  {} Connection lost mid-reply ({turns} turns received)",
            style("✗").red()
        )
    } else if snapshot.done {
        format!("  {} Done ({turns} turns)", style("✓").green())
    } else {
        format!("  {} Interrupted ({turns} turns)", style("·").dim())
    }
}
