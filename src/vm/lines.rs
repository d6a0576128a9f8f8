/// Line number used for bytes that have no source line (synthetic instructions).
pub const SYNTHETIC_LINE: u32 = 0;

/// One stretch of consecutive bytes emitted for the same source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun {
    pub length: usize,
    pub line: u32,
}

/// Run-length encoded offset -> source line table.
///
/// `ends[i]` is the offset one past the last byte covered by `runs[i]`, so a lookup is a
/// binary search instead of a walk over every run.
#[derive(Debug, Clone, Default)]
pub struct LineRuns {
    runs: Vec<LineRun>,
    ends: Vec<usize>,
}

impl LineRuns {
    pub fn new() -> LineRuns {
        LineRuns::default()
    }

    /// Records one more byte for `line`, extending the last run when the line is unchanged.
    pub fn push(&mut self, line: u32) {
        let total = self.len();
        match self.runs.last_mut() {
            Some(run) if run.line == line => {
                run.length += 1;
                if let Some(end) = self.ends.last_mut() {
                    *end += 1;
                }
            }
            _ => {
                self.runs.push(LineRun { length: 1, line });
                self.ends.push(total + 1);
            }
        }
    }

    /// Source line of the byte at `offset`, or `None` past the last recorded byte.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        let idx = self.ends.partition_point(|&end| end <= offset);
        self.runs.get(idx).map(|run| run.line)
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[LineRun] {
        &self.runs
    }
}
