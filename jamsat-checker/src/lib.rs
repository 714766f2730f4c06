//! Independent checker for JamSAT proofs.
//!
//! This verifies the AT (asymmetric tautology) steps a solver run emits: a clause is an AT wrt.
//! the current formula if setting its literals false and running unit propagation derives a
//! conflict (the RUP check). Deletions, unit clauses, models and failed-assumption cores are
//! checked against the same formula state. RAT steps are not supported (see the crate-level
//! rationale in the solver's `proof` module).
use std::convert::TryInto;
use std::io;
use std::mem::{replace, transmute};
use std::ops::Range;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use thiserror::Error;

use jamsat_dimacs::DimacsParser;
use jamsat_formula::{lit::LitIdx, CnfFormula, Lit, Var};
use jamsat_proof::{binary_format::Parser, ClauseHash, DeleteClauseProof, ProofStep};

mod transcript;

pub use transcript::{ProofTranscriptProcessor, ProofTranscriptStep};

/// Possible errors while checking a JamSAT proof.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("step {}: unexpected end of proof file", step)]
    ProofIncomplete { step: u64 },
    #[error("step {}: error reading proof file: {}", step, cause)]
    IoError { step: u64, cause: io::Error },
    #[error("step {}: could not parse proof step: {}", step, cause)]
    ParseError { step: u64, cause: anyhow::Error },
    #[error("step {}: checking proof failed: {}", step, msg)]
    CheckFailed {
        step: u64,
        msg: String,
        debug_step: String,
    },
    #[error("error in proof processor: {}", cause)]
    ProofProcessorError { cause: anyhow::Error },
}

impl CheckerError {
    fn check_failed(step: u64, msg: String) -> CheckerError {
        CheckerError::CheckFailed {
            step,
            msg,
            debug_step: String::new(),
        }
    }
}

/// A single step of a checked proof, with clause ids assigned by the checker.
///
/// Whenever the literals of a clause are included in a step, they are sorted and free of
/// duplicates.
#[derive(Debug)]
pub enum CheckedProofStep<'a> {
    /// A clause of the input formula.
    AddClause { id: u64, clause: &'a [Lit] },
    /// A duplicated clause of the input formula.
    ///
    /// The checker detects duplicated clauses and reuses the same id for all copies, including
    /// input-formula clauses, so processors can identify them by consecutive ids. The allocated id
    /// is not used for anything else.
    DuplicatedClause {
        id: u64,
        same_as_id: u64,
        clause: &'a [Lit],
    },
    /// A tautological clause of the input formula; only used to give it an id.
    TautologicalClause { id: u64, clause: &'a [Lit] },
    /// Addition of an asymmetric tautology (AT).
    ///
    /// `propagations` lists the clause ids that became unit, in propagation order, with the last
    /// element the clause that produced the conflict.
    AtClause {
        id: u64,
        redundant: bool,
        clause: &'a [Lit],
        propagations: &'a [u64],
    },
    /// Deletion of a redundant clause.
    DeleteClause { id: u64, clause: &'a [Lit] },
    /// Deletion of a clause that is an AT wrt. the remaining irredundant clauses.
    DeleteAtClause {
        id: u64,
        keep_as_redundant: bool,
        clause: &'a [Lit],
        propagations: &'a [u64],
    },
    /// Make a redundant clause irredundant.
    MakeIrredundant { id: u64, clause: &'a [Lit] },
    /// A (partial) assignment that satisfies all clauses and assumptions.
    Model { assignment: &'a [Lit] },
    /// Change the active set of assumptions.
    Assumptions { assumptions: &'a [Lit] },
    /// Subset of assumptions incompatible with the formula.
    FailedAssumptions {
        failed_core: &'a [Lit],
        propagations: &'a [u64],
    },
}

/// Implement to process checked proof steps as they're verified.
pub trait ProofProcessor {
    fn process_step(&mut self, step: &CheckedProofStep) -> Result<(), anyhow::Error>;
}

const INLINE_LITS: usize = 3;

/// Literals of a clause, either stored inline or as an index into the shared literal buffer.
struct ClauseLits {
    length: LitIdx,
    inline: [LitIdx; INLINE_LITS],
}

impl ClauseLits {
    fn new(lits: &[Lit], buffer: &mut Vec<Lit>) -> ClauseLits {
        let mut inline = [0; INLINE_LITS];
        let length = lits.len();

        if length > INLINE_LITS {
            inline[0] = buffer
                .len()
                .try_into()
                .expect("exceeded maximal literal buffer size");
            buffer.extend(lits);
        } else {
            let lits = unsafe {
                // Lit is a repr(transparent) wrapper of LitIdx
                transmute::<&[Lit], &[LitIdx]>(lits)
            };
            inline[..length].copy_from_slice(lits);
        }

        ClauseLits {
            length: length as LitIdx,
            inline,
        }
    }

    fn slice<'a, 'b, 'c>(&'a self, buffer: &'b [Lit]) -> &'c [Lit]
    where
        'a: 'c,
        'b: 'c,
    {
        if self.length > INLINE_LITS as LitIdx {
            &buffer[self.inline[0] as usize..][..self.length as usize]
        } else {
            unsafe { transmute::<&[LitIdx], &[Lit]>(&self.inline[..self.length as usize]) }
        }
    }

    fn buffer_used(&self) -> usize {
        if self.length > INLINE_LITS as LitIdx {
            self.length as usize
        } else {
            0
        }
    }
}

/// Literals and metadata for non-unit clauses.
struct Clause {
    id: u64,
    /// How often the clause is present as irred., red. clause.
    ///
    /// A checked formula is a multiset of clauses: the generating solver isn't required to
    /// deduplicate.
    ref_count: [u32; 2],
    lits: ClauseLits,
}

/// Identifies the origin of a unit clause.
#[derive(Copy, Clone, Debug)]
enum UnitId {
    Global(u64),
    TracePos(usize),
    InClause,
}

#[derive(Copy, Clone, Debug)]
struct UnitClause {
    id: UnitId,
    value: bool,
}

/// A propagation step of the RUP check.
struct TraceItem {
    id: u64,
    edges: Range<usize>,
    unused: bool,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum StoreClauseResult {
    New,
    Duplicate,
    NewlyIrredundant,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum DeleteClauseResult {
    Unchanged,
    NewlyRedundant,
    Removed,
}

#[derive(Clone, Default)]
struct LitData {
    clause_count: usize,
}

/// Registry of proof and transcript processors.
#[derive(Default)]
struct Processing<'a> {
    processors: Vec<&'a mut dyn ProofProcessor>,
    transcript_processors: Vec<&'a mut dyn ProofTranscriptProcessor>,
    transcript: transcript::Transcript,
}

impl<'a> Processing<'a> {
    fn step(&mut self, step: &CheckedProofStep) -> Result<(), CheckerError> {
        for processor in self.processors.iter_mut() {
            if let Err(cause) = processor.process_step(step) {
                return Err(CheckerError::ProofProcessorError { cause });
            }
        }
        if !self.transcript_processors.is_empty() {
            if let Some(transcript_step) = self.transcript.transcript_step(step) {
                for processor in self.transcript_processors.iter_mut() {
                    if let Err(cause) = processor.process_step(&transcript_step) {
                        return Err(CheckerError::ProofProcessorError { cause });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A checker for unsatisfiability proofs in the native JamSAT proof format.
pub struct Checker<'a> {
    step: u64,
    next_clause_id: u64,
    literal_buffer: Vec<Lit>,
    garbage_size: usize,
    clauses: FxHashMap<ClauseHash, SmallVec<[Clause; 1]>>,
    unit_clauses: Vec<Option<UnitClause>>,
    lit_data: Vec<LitData>,
    var_count: usize,
    trail: Vec<(Lit, Option<UnitClause>)>,
    unsat: bool,
    ended: bool,
    trace: Vec<TraceItem>,
    trace_edges: Vec<LitIdx>,
    trace_ids: Vec<u64>,
    processing: Processing<'a>,
    /// A conflict between two input unit clauses.
    ///
    /// The unit clause representation can't express conflicting units directly, so this is
    /// reported separately at the end of checking.
    unit_conflict: Option<[u64; 2]>,
    tmp: Vec<Lit>,
    previous_irred_clause_id: Option<u64>,
    previous_irred_clause_lits: Vec<Lit>,
    assumptions: Vec<Lit>,
}

impl<'a> Default for Checker<'a> {
    fn default() -> Checker<'a> {
        Checker {
            step: 0,
            next_clause_id: 0,
            literal_buffer: vec![],
            garbage_size: 0,
            clauses: Default::default(),
            unit_clauses: vec![],
            lit_data: vec![],
            var_count: 0,
            trail: vec![],
            unsat: false,
            ended: false,
            trace: vec![],
            trace_edges: vec![],
            trace_ids: vec![],
            processing: Default::default(),
            unit_conflict: None,
            tmp: vec![],
            previous_irred_clause_id: None,
            previous_irred_clause_lits: vec![],
            assumptions: vec![],
        }
    }
}

impl<'a> Checker<'a> {
    /// Create a new checker.
    pub fn new() -> Checker<'a> {
        Checker::default()
    }

    /// Whether the checker has proven unsatisfiability.
    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    /// Add a formula to the checker.
    pub fn add_formula(&mut self, formula: &CnfFormula) -> Result<(), CheckerError> {
        for clause in formula.iter() {
            self.add_clause(clause)?;
        }
        Ok(())
    }

    /// Adds a clause to the checker.
    pub fn add_clause(&mut self, clause: &[Lit]) -> Result<(), CheckerError> {
        if self.unsat {
            return Ok(());
        }

        let mut tmp = replace(&mut self.tmp, vec![]);

        if copy_canonical(&mut tmp, clause) {
            self.processing.step(&CheckedProofStep::TautologicalClause {
                id: self.next_clause_id,
                clause: &tmp,
            })?;
            self.next_clause_id += 1;
            self.tmp = tmp;
            return Ok(());
        }

        let (id, added) = self.store_clause(&tmp, false);

        match added {
            StoreClauseResult::New => {
                self.processing.step(&CheckedProofStep::AddClause {
                    id,
                    clause: &tmp,
                })?;
            }
            StoreClauseResult::NewlyIrredundant | StoreClauseResult::Duplicate => {
                if let StoreClauseResult::NewlyIrredundant = added {
                    self.processing
                        .step(&CheckedProofStep::MakeIrredundant { id, clause: &tmp })?;
                }

                self.processing.step(&CheckedProofStep::DuplicatedClause {
                    id: self.next_clause_id,
                    same_as_id: id,
                    clause: &tmp,
                })?;
                // Keeps clause ids matching input order even for duplicates.
                self.next_clause_id += 1;
            }
        }

        self.tmp = tmp;
        Ok(())
    }

    /// Reads and adds a formula in DIMACS CNF format.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), anyhow::Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula())?;
            Ok(())
        })?;

        log::info!(
            "parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    fn ensure_var(&mut self, var: Var) {
        if self.var_count <= var.index() {
            self.var_count = var.index() + 1;
            self.lit_data.resize(self.var_count * 2, LitData::default());
            self.unit_clauses.resize(self.var_count, None);
        }
    }

    /// Value of a literal if known from unit clauses.
    fn lit_value(&self, lit: Lit) -> Option<(bool, UnitClause)> {
        self.unit_clauses[lit.index()]
            .map(|unit_clause| (unit_clause.value ^ lit.is_negative(), unit_clause))
    }

    /// Adds a clause to the checker data structures; `lits` must be sorted and duplicate-free.
    ///
    /// Returns the id of the added clause and whether it is new or changed from redundant to
    /// irredundant.
    fn store_clause(&mut self, lits: &[Lit], redundant: bool) -> (u64, StoreClauseResult) {
        for &lit in lits.iter() {
            self.ensure_var(lit.var());
        }

        match lits[..] {
            [] => {
                let id = self.next_clause_id;
                self.next_clause_id += 1;
                self.unsat = true;
                (id, StoreClauseResult::New)
            }
            [lit] => self.store_unit_clause(lit),
            _ => {
                let hash = jamsat_proof::clause_hash(lits);
                let candidates = self.clauses.entry(hash).or_default();

                for candidate in candidates.iter_mut() {
                    if candidate.lits.slice(&self.literal_buffer) == lits {
                        let result = if !redundant && candidate.ref_count[0] == 0 {
                            StoreClauseResult::NewlyIrredundant
                        } else {
                            StoreClauseResult::Duplicate
                        };

                        let ref_count = &mut candidate.ref_count[redundant as usize];
                        *ref_count = ref_count.checked_add(1).expect("ref_count overflow");
                        return (candidate.id, result);
                    }
                }

                let id = self.next_clause_id;
                let mut ref_count = [0, 0];
                ref_count[redundant as usize] += 1;

                candidates.push(Clause {
                    id,
                    ref_count,
                    lits: ClauseLits::new(lits, &mut self.literal_buffer),
                });

                self.next_clause_id += 1;

                for &lit in lits.iter() {
                    self.lit_data[lit.code()].clause_count += 1;
                }

                (id, StoreClauseResult::New)
            }
        }
    }

    fn store_unit_clause(&mut self, lit: Lit) -> (u64, StoreClauseResult) {
        match self.lit_value(lit) {
            Some((
                true,
                UnitClause {
                    id: UnitId::Global(id),
                    ..
                },
            )) => (id, StoreClauseResult::Duplicate),
            Some((
                false,
                UnitClause {
                    id: UnitId::Global(conflicting_id),
                    ..
                },
            )) => {
                self.unsat = true;
                let id = self.next_clause_id;
                self.unit_conflict = Some([conflicting_id, id]);
                self.next_clause_id += 1;
                (id, StoreClauseResult::New)
            }
            Some(_) => unreachable!("in-progress RUP check leaked into stored unit clauses"),
            None => {
                let id = self.next_clause_id;
                self.unit_clauses[lit.index()] = Some(UnitClause {
                    value: lit.is_positive(),
                    id: UnitId::Global(id),
                });
                self.next_clause_id += 1;
                (id, StoreClauseResult::New)
            }
        }
    }

    /// Delete a clause from the current formula; `lits` must be sorted and duplicate-free.
    fn delete_clause(
        &mut self,
        lits: &[Lit],
        redundant: bool,
    ) -> Result<(u64, DeleteClauseResult), CheckerError> {
        if lits.len() < 2 {
            return Err(CheckerError::check_failed(
                self.step,
                format!("delete of unit or empty clause {:?}", lits),
            ));
        }

        let hash = jamsat_proof::clause_hash(lits);
        let candidates = self.clauses.entry(hash).or_default();

        let mut found = false;
        let mut result = None;

        let literal_buffer = &self.literal_buffer;
        let garbage_size = &mut self.garbage_size;

        candidates.retain(|candidate| {
            if found || candidate.lits.slice(literal_buffer) != lits {
                true
            } else {
                found = true;
                let ref_count = &mut candidate.ref_count[redundant as usize];

                if *ref_count == 0 {
                    true
                } else {
                    *ref_count -= 1;

                    if candidate.ref_count == [0, 0] {
                        *garbage_size += candidate.lits.buffer_used();
                        result = Some((candidate.id, DeleteClauseResult::Removed));
                        false
                    } else {
                        if !redundant && candidate.ref_count[0] == 0 {
                            result = Some((candidate.id, DeleteClauseResult::NewlyRedundant));
                        } else {
                            result = Some((candidate.id, DeleteClauseResult::Unchanged));
                        }
                        true
                    }
                }
            }
        });

        if candidates.is_empty() {
            self.clauses.remove(&hash);
        }

        if let Some((_, DeleteClauseResult::Removed)) = result {
            for &lit in lits.iter() {
                self.lit_data[lit.code()].clause_count -= 1;
            }
        }

        if let Some(result) = result {
            self.collect_garbage();
            return Ok(result);
        }

        let msg = match (found, redundant) {
            (false, _) => format!("delete of unknown clause {:?}", lits),
            (_, true) => format!("delete of redundant clause {:?} which is irredundant", lits),
            (_, false) => format!("delete of irredundant clause {:?} which is redundant", lits),
        };
        Err(CheckerError::check_failed(self.step, msg))
    }

    fn collect_garbage(&mut self) {
        if self.garbage_size * 2 <= self.literal_buffer.len() {
            return;
        }

        let mut new_buffer = vec![];
        new_buffer.reserve(self.literal_buffer.len());

        for candidates in self.clauses.values_mut() {
            for clause in candidates.iter_mut() {
                let new_lits = ClauseLits::new(clause.lits.slice(&self.literal_buffer), &mut new_buffer);
                clause.lits = new_lits;
            }
        }

        self.literal_buffer = new_buffer;
        self.garbage_size = 0;
    }

    /// Check whether a clause is implied (RUP) by the clauses reachable through the given hashes.
    ///
    /// `lits` must be sorted and free of duplicates.
    fn check_clause_with_hashes(
        &mut self,
        lits: &[Lit],
        propagation_hashes: &[ClauseHash],
    ) -> Result<(), CheckerError> {
        self.trace.clear();
        self.trace_edges.clear();

        let mut rup_is_unsat = false;

        assert!(self.trail.is_empty());

        for &lit in lits.iter() {
            self.ensure_var(lit.var());
        }

        for &lit in lits.iter() {
            if let Some((true, unit)) = self.lit_value(lit) {
                if let UnitId::Global(id) = unit.id {
                    self.trace_ids.clear();
                    self.trace_ids.push(id);
                    return Ok(());
                } else {
                    unreachable!("unexpected non-global unit outside a RUP check");
                }
            }
        }

        for &lit in lits.iter() {
            self.trail.push((lit, self.unit_clauses[lit.index()]));
            self.unit_clauses[lit.index()] = Some(UnitClause {
                value: lit.is_negative(),
                id: UnitId::InClause,
            });
        }

        'hashes: for &hash in propagation_hashes.iter() {
            let candidates = match self.clauses.get(&hash) {
                Some(candidates) if !candidates.is_empty() => candidates,
                _ => {
                    return Err(CheckerError::check_failed(
                        self.step,
                        format!("no clause found for hash {:x}", hash),
                    ))
                }
            };

            'candidates: for clause in candidates.iter() {
                let mut unassigned_count = 0;
                let mut unassigned_lit = None;

                let range_begin = self.trace_edges.len();

                for &lit in clause.lits.slice(&self.literal_buffer).iter() {
                    match self.lit_value(lit) {
                        Some((true, _)) => continue 'candidates,
                        Some((false, unit)) => match unit.id {
                            UnitId::Global(id) => {
                                self.trail.push((lit, self.unit_clauses[lit.index()]));
                                self.unit_clauses[lit.index()] = Some(UnitClause {
                                    value: lit.is_negative(),
                                    id: UnitId::TracePos(self.trace.len()),
                                });

                                self.trace_edges.push(self.trace.len() as LitIdx);

                                self.trace.push(TraceItem {
                                    id,
                                    edges: 0..0,
                                    unused: true,
                                });
                            }
                            UnitId::TracePos(pos) => {
                                self.trace_edges.push(pos as LitIdx);
                            }
                            UnitId::InClause => {}
                        },
                        None => {
                            unassigned_count += 1;
                            unassigned_lit = Some(lit);
                        }
                    }
                }

                let range = range_begin..self.trace_edges.len();

                match unassigned_lit {
                    None => {
                        self.trace.push(TraceItem {
                            id: clause.id,
                            edges: range,
                            unused: false,
                        });
                        rup_is_unsat = true;
                        break 'hashes;
                    }
                    Some(lit) if unassigned_count == 1 => {
                        self.trail.push((lit, self.unit_clauses[lit.index()]));
                        self.unit_clauses[lit.index()] = Some(UnitClause {
                            value: lit.is_positive(),
                            id: UnitId::TracePos(self.trace.len()),
                        });
                        self.trace.push(TraceItem {
                            id: clause.id,
                            edges: range,
                            unused: true,
                        });
                    }
                    _ => (),
                }
            }
        }

        if rup_is_unsat && !self.processing.processors.is_empty() {
            for i in (0..self.trace.len()).rev() {
                if !self.trace[i].unused {
                    let edges = self.trace[i].edges.clone();
                    for &edge in self.trace_edges[edges].iter() {
                        self.trace[edge as usize].unused = false;
                    }
                }
            }
            self.trace_ids.clear();
            self.trace_ids.extend(self.trace.iter().map(|trace| trace.id));
        }

        for (lit, value) in self.trail.drain(..).rev() {
            self.unit_clauses[lit.index()] = value;
        }

        if rup_is_unsat {
            Ok(())
        } else {
            Err(CheckerError::check_failed(
                self.step,
                format!("AT check failed for {:?}", lits),
            ))
        }
    }

    fn subsumed_by_previous_irred_clause(&self, lits: &[Lit]) -> bool {
        if self.previous_irred_clause_id.is_none() {
            return false;
        }
        is_subset(&self.previous_irred_clause_lits, lits, true)
    }

    /// Check a single proof step.
    fn check_step(&mut self, step: ProofStep) -> Result<(), CheckerError> {
        let mut result = match step {
            ProofStep::AddClause { clause } => self.add_clause(clause).map_err(|e| e.into()),
            ProofStep::AtClause {
                redundant,
                clause,
                propagation_hashes,
            } => self.check_at_clause_step(redundant, clause, propagation_hashes),
            ProofStep::DeleteClause { clause, proof } => self.check_delete_clause_step(clause, proof),
            ProofStep::UnitClauses(units) => self.check_unit_clauses_step(units),
            ProofStep::Model(model) => self.check_model_step(model),
            ProofStep::Assumptions(assumptions) => {
                copy_canonical(&mut self.assumptions, assumptions);
                self.processing.step(&CheckedProofStep::Assumptions {
                    assumptions: &self.assumptions,
                })
            }
            ProofStep::FailedAssumptions {
                failed_core,
                propagation_hashes,
            } => self.check_failed_assumptions_step(failed_core, propagation_hashes),
            ProofStep::End => {
                self.ended = true;
                Ok(())
            }
        };

        if let Err(CheckerError::CheckFailed {
            ref mut debug_step, ..
        }) = result
        {
            *debug_step = format!("{:?}", step)
        }
        result
    }

    fn check_at_clause_step(
        &mut self,
        redundant: bool,
        clause: &[Lit],
        propagation_hashes: &[ClauseHash],
    ) -> Result<(), CheckerError> {
        let mut tmp = replace(&mut self.tmp, vec![]);

        if copy_canonical(&mut tmp, clause) {
            return Err(CheckerError::check_failed(
                self.step,
                format!("clause {:?} is a tautology", tmp),
            ));
        }

        self.check_clause_with_hashes(&tmp, propagation_hashes)?;

        let (id, added) = self.store_clause(&tmp, redundant);

        if !redundant {
            self.previous_irred_clause_id = Some(id);
            self.previous_irred_clause_lits.clear();
            self.previous_irred_clause_lits.extend_from_slice(&tmp);
        }

        match added {
            StoreClauseResult::New => {
                self.processing.step(&CheckedProofStep::AtClause {
                    id,
                    redundant,
                    clause: &tmp,
                    propagations: &self.trace_ids,
                })?;
            }
            StoreClauseResult::NewlyIrredundant => {
                self.processing
                    .step(&CheckedProofStep::MakeIrredundant { id, clause: &tmp })?;
            }
            StoreClauseResult::Duplicate => (),
        }

        self.tmp = tmp;
        Ok(())
    }

    fn check_delete_clause_step(
        &mut self,
        clause: &[Lit],
        proof: DeleteClauseProof,
    ) -> Result<(), CheckerError> {
        let mut tmp = replace(&mut self.tmp, vec![]);

        if copy_canonical(&mut tmp, clause) {
            return Err(CheckerError::check_failed(
                self.step,
                format!("clause {:?} is a tautology", tmp),
            ));
        }

        let redundant = proof == DeleteClauseProof::Redundant;
        let mut subsumed_by = None;

        match proof {
            DeleteClauseProof::Redundant => (),
            DeleteClauseProof::Satisfied => {
                if !tmp.iter().any(|&lit| {
                    if let Some((
                        true,
                        UnitClause {
                            id: UnitId::Global(id),
                            ..
                        },
                    )) = self.lit_value(lit)
                    {
                        subsumed_by = Some(id);
                        true
                    } else {
                        false
                    }
                }) {
                    return Err(CheckerError::check_failed(
                        self.step,
                        format!("deleted clause {:?} is not satisfied", clause),
                    ));
                }
            }
            DeleteClauseProof::Simplified => {
                subsumed_by = self.previous_irred_clause_id;
                if !self.subsumed_by_previous_irred_clause(&tmp) {
                    return Err(CheckerError::check_failed(
                        self.step,
                        format!(
                            "deleted clause {:?} is not subsumed by previous clause {:?}",
                            clause, self.previous_irred_clause_lits
                        ),
                    ));
                }
            }
        }

        self.previous_irred_clause_id = None;
        self.previous_irred_clause_lits.clear();

        let (id, deleted) = self.delete_clause(&tmp, redundant)?;

        if redundant {
            match deleted {
                DeleteClauseResult::Removed => {
                    self.processing
                        .step(&CheckedProofStep::DeleteClause { id, clause: &tmp })?;
                }
                DeleteClauseResult::Unchanged => (),
                DeleteClauseResult::NewlyRedundant => unreachable!(),
            }
        } else {
            match deleted {
                DeleteClauseResult::Removed | DeleteClauseResult::NewlyRedundant => {
                    self.processing.step(&CheckedProofStep::DeleteAtClause {
                        id,
                        keep_as_redundant: deleted == DeleteClauseResult::NewlyRedundant,
                        clause: &tmp,
                        propagations: &[subsumed_by.expect("subsumption justification missing")],
                    })?;
                }
                DeleteClauseResult::Unchanged => (),
            }
        }

        self.tmp = tmp;
        Ok(())
    }

    fn check_unit_clauses_step(&mut self, units: &[(Lit, ClauseHash)]) -> Result<(), CheckerError> {
        for &(lit, hash) in units.iter() {
            self.ensure_var(lit.var());

            let clause = [lit];
            let propagation_hashes = [hash];
            self.check_clause_with_hashes(&clause, &propagation_hashes)?;

            let (id, added) = self.store_unit_clause(lit);

            match added {
                StoreClauseResult::New => {
                    self.processing.step(&CheckedProofStep::AtClause {
                        id,
                        redundant: false,
                        clause: &clause,
                        propagations: &self.trace_ids,
                    })?;
                }
                StoreClauseResult::Duplicate => (),
                StoreClauseResult::NewlyIrredundant => unreachable!(),
            }
        }
        Ok(())
    }

    fn check_model_step(&mut self, model: &[Lit]) -> Result<(), CheckerError> {
        let mut assignments = FxHashSet::default();

        for &lit in model.iter() {
            if let Some((false, _)) = self.lit_value(lit) {
                return Err(CheckerError::check_failed(
                    self.step,
                    format!("model assignment conflicts with unit clause {:?}", !lit),
                ));
            }
            if assignments.contains(&!lit) {
                return Err(CheckerError::check_failed(
                    self.step,
                    format!("model contains conflicting assignment {:?}", !lit),
                ));
            }
            assignments.insert(lit);
        }

        for &lit in self.assumptions.iter() {
            if !assignments.contains(&lit) {
                return Err(CheckerError::check_failed(
                    self.step,
                    format!("model does not contain assumption {:?}", lit),
                ));
            }
        }

        for candidates in self.clauses.values() {
            for clause in candidates.iter() {
                let lits = clause.lits.slice(&self.literal_buffer);
                if !lits.iter().any(|lit| assignments.contains(lit)) {
                    return Err(CheckerError::check_failed(
                        self.step,
                        format!("model does not satisfy clause {:?}", lits),
                    ));
                }
            }
        }

        self.processing
            .step(&CheckedProofStep::Model { assignment: model })?;

        Ok(())
    }

    fn check_failed_assumptions_step(
        &mut self,
        failed_core: &[Lit],
        propagation_hashes: &[ClauseHash],
    ) -> Result<(), CheckerError> {
        let mut tmp = replace(&mut self.tmp, vec![]);

        let direct_conflict = copy_canonical(&mut tmp, failed_core);

        if !is_subset(&tmp, &self.assumptions, false) {
            return Err(CheckerError::check_failed(
                self.step,
                "failed core contains non-assumed variables".to_string(),
            ));
        }

        if direct_conflict {
            self.trace_ids.clear();
        } else {
            for lit in tmp.iter_mut() {
                *lit = !*lit;
            }
            self.check_clause_with_hashes(&tmp, propagation_hashes)?;
            for lit in tmp.iter_mut() {
                *lit = !*lit;
            }
        }

        self.processing.step(&CheckedProofStep::FailedAssumptions {
            failed_core: &tmp,
            propagations: &self.trace_ids,
        })?;

        self.tmp = tmp;
        Ok(())
    }

    /// Checks a proof in the native JamSAT proof format.
    pub fn check_proof(&mut self, input: impl io::Read) -> Result<(), CheckerError> {
        let mut buffer = io::BufReader::new(input);
        let mut parser = Parser::default();

        while !self.ended {
            self.step += 1;

            if self.step % 100_000 == 0 {
                log::info!("checking step {}k", self.step / 1000);
            }

            match parser.parse_step(&mut buffer) {
                Ok(step) => self.check_step(step)?,
                Err(err) => match err.downcast::<io::Error>() {
                    Ok(io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
                        return Err(CheckerError::ProofIncomplete { step: self.step });
                    }
                    Ok(io_err) => {
                        return Err(CheckerError::IoError {
                            step: self.step,
                            cause: io_err,
                        })
                    }
                    Err(err) => {
                        return Err(CheckerError::ParseError {
                            step: self.step,
                            cause: err,
                        })
                    }
                },
            }
        }

        self.process_unit_conflicts()
    }

    fn process_unit_conflicts(&mut self) -> Result<(), CheckerError> {
        if let Some(ids) = &self.unit_conflict {
            self.processing.step(&CheckedProofStep::AtClause {
                id: self.next_clause_id,
                redundant: false,
                clause: &[],
                propagations: ids,
            })?;
        }
        Ok(())
    }

    /// Add a [`ProofProcessor`]. Must be called before loading clauses or checking a proof.
    pub fn add_processor(&mut self, processor: &'a mut dyn ProofProcessor) {
        self.processing.processors.push(processor);
    }

    /// Add a [`ProofTranscriptProcessor`]. Must be called before loading clauses or checking a
    /// proof.
    pub fn add_transcript(&mut self, processor: &'a mut dyn ProofTranscriptProcessor) {
        self.processing.transcript_processors.push(processor);
    }
}

/// Whether `subset` is a (strict, if requested) subset of `superset`. Both must be sorted.
fn is_subset(mut subset: &[Lit], mut superset: &[Lit], strict: bool) -> bool {
    let mut is_strict = !strict;

    while let Some((&sub_min, sub_rest)) = subset.split_first() {
        if let Some((&super_min, super_rest)) = superset.split_first() {
            if sub_min < super_min {
                return false;
            } else if sub_min > super_min {
                superset = super_rest;
                is_strict = true;
            } else {
                superset = super_rest;
                subset = sub_rest;
            }
        } else {
            return false;
        }
    }
    is_strict |= !superset.is_empty();
    is_strict
}

/// Sort literals, remove duplicates, and report whether the clause is a tautology.
fn copy_canonical(target: &mut Vec<Lit>, src: &[Lit]) -> bool {
    target.clear();
    target.extend_from_slice(src);
    target.sort();
    target.dedup();

    let mut last = None;
    target.iter().any(|&lit| {
        let tautology = last == Some(!lit);
        last = Some(lit);
        tautology
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use jamsat_formula::{cnf_formula, lits};

    fn expect_check_failed(result: Result<(), CheckerError>, contains: &str) {
        match result {
            Err(CheckerError::CheckFailed { ref msg, .. }) if msg.contains(contains) => (),
            err => panic!("expected {:?} error but got {:?}", contains, err),
        }
    }

    #[test]
    fn conflicting_units() {
        let mut checker = Checker::new();

        checker
            .add_formula(&cnf_formula![
                1;
                -1;
            ])
            .unwrap();

        assert!(checker.is_unsat());
    }

    #[test]
    fn invalid_delete() {
        let mut checker = Checker::new();

        checker
            .add_formula(&cnf_formula![
                1, 2, 3;
                -4, 5;
            ])
            .unwrap();

        expect_check_failed(
            checker.check_step(ProofStep::DeleteClause {
                clause: &lits![-5, 4],
                proof: DeleteClauseProof::Redundant,
            }),
            "unknown clause",
        );
    }

    #[test]
    fn ref_counts() {
        let mut checker = Checker::new();

        checker
            .add_formula(&cnf_formula![
                1, 2, 3;
                1, 2, 3;
                1;
            ])
            .unwrap();

        let lits = &lits![1, 2, 3][..];

        checker
            .check_step(ProofStep::DeleteClause {
                clause: lits,
                proof: DeleteClauseProof::Satisfied,
            })
            .unwrap();

        checker.add_clause(lits).unwrap();

        checker
            .check_step(ProofStep::DeleteClause {
                clause: lits,
                proof: DeleteClauseProof::Satisfied,
            })
            .unwrap();
    }

    #[test]
    fn rup_check_across_formula() {
        let mut checker = Checker::new();

        checker
            .add_formula(&cnf_formula![
                1, 2;
                -1, 2;
                1, -2;
            ])
            .unwrap();

        // -1,-2 together with the formula above has no model, so asserting the empty clause is an
        // AT: every literal propagates to a conflict via unit resolution on {1,2} or {-1,2} etc.
        let propagation_hashes: Vec<ClauseHash> = vec![];
        let result = checker.check_clause_with_hashes(&[], &propagation_hashes);
        assert!(result.is_err());
    }
}
