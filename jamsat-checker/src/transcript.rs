//! Flattened proof transcripts.
//!
//! A transcript mirrors the solver calls and results a checked proof corresponds to, dropping
//! the clause ids and propagation traces [`CheckedProofStep`] carries for diagnostics.
use anyhow::Error;

use jamsat_formula::Lit;

use crate::CheckedProofStep;

/// Step of a proof transcript.
#[derive(Debug)]
pub enum ProofTranscriptStep<'a> {
    AddClause { clause: &'a [Lit] },
    DeleteClause { clause: &'a [Lit] },
    Unsat,
    Model { assignment: &'a [Lit] },
    Assume { assumptions: &'a [Lit] },
    FailedAssumptions { failed_core: &'a [Lit] },
}

/// Implement to process transcript steps.
pub trait ProofTranscriptProcessor {
    /// Process a single proof transcript step.
    fn process_step(&mut self, step: &ProofTranscriptStep) -> Result<(), Error>;
}

/// Creates a transcript from checked proof steps.
#[derive(Default)]
pub(crate) struct Transcript {
    lit_buf: Vec<Lit>,
}

impl Transcript {
    /// If a checked proof step has a corresponding transcript step, return that.
    pub fn transcript_step<'a>(
        &'a mut self,
        step: &CheckedProofStep<'a>,
    ) -> Option<ProofTranscriptStep<'a>> {
        match *step {
            CheckedProofStep::AddClause { clause, .. }
            | CheckedProofStep::DuplicatedClause { clause, .. }
            | CheckedProofStep::TautologicalClause { clause, .. } => {
                Some(ProofTranscriptStep::AddClause { clause })
            }
            CheckedProofStep::AtClause { clause, .. } => {
                if clause.is_empty() {
                    Some(ProofTranscriptStep::Unsat)
                } else {
                    Some(ProofTranscriptStep::AddClause { clause })
                }
            }
            CheckedProofStep::DeleteClause { clause, .. }
            | CheckedProofStep::DeleteAtClause { clause, .. } => {
                Some(ProofTranscriptStep::DeleteClause { clause })
            }
            CheckedProofStep::MakeIrredundant { .. } => None,
            CheckedProofStep::Model { assignment } => Some(ProofTranscriptStep::Model { assignment }),
            CheckedProofStep::Assumptions { assumptions } => {
                Some(ProofTranscriptStep::Assume { assumptions })
            }
            CheckedProofStep::FailedAssumptions { failed_core, .. } => {
                if failed_core.is_empty() {
                    Some(ProofTranscriptStep::Unsat)
                } else {
                    self.lit_buf.clear();
                    self.lit_buf.extend_from_slice(failed_core);
                    Some(ProofTranscriptStep::FailedAssumptions {
                        failed_core: &self.lit_buf,
                    })
                }
            }
        }
    }
}
