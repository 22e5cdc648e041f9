//! Structural annotations over a ground program.
//!
//! The unfounded-set machinery needs to know, per strongly connected
//! component of the positive dependency graph: which atoms and rules
//! belong to it, whether it contains head cycles, and whether it contains
//! cycles through external-auxiliary atoms. Dependencies through an
//! external atom run from its output auxiliaries to its input atoms.

use std::collections::HashMap;

use asperity_base::{AtomId, Interpretation};
use tracing::debug;

use crate::program::GroundProgram;
use crate::registry::{AtomInfo, ExternalAtomId, Registry};
use crate::rule::RuleId;

/// One strongly connected component of the positive dependency graph.
#[derive(Debug, Clone)]
pub struct Component {
    /// Atoms of the component.
    pub atoms: Interpretation,
    /// Rules whose head intersects the component.
    pub rules: Vec<RuleId>,
    /// Whether some rule has two or more head atoms inside the component.
    pub head_cycles: bool,
    /// Whether the component contains a cycle through an
    /// external-auxiliary atom.
    pub e_cycles: bool,
}

/// A ground program plus the structural annotations the checkers consume.
///
/// Produced once per grounding round; read-only afterwards. `extend`
/// accumulates additional rules and re-derives the annotations, keeping
/// all atom addresses stable.
#[derive(Debug)]
pub struct AnnotatedGroundProgram {
    program: GroundProgram,
    num_atoms: usize,
    components: Vec<Component>,
    component_of: Vec<Option<usize>>,
    head_cycles: bool,
    e_cycles: bool,
    aux_to_external: HashMap<AtomId, Vec<ExternalAtomId>>,
    input_masks: Vec<Interpretation>,
    output_masks: Vec<Interpretation>,
}

impl AnnotatedGroundProgram {
    /// Analyzes a program against the registry, deriving all annotations
    /// locally.
    #[must_use]
    pub fn analyze(program: GroundProgram, registry: &Registry) -> Self {
        let num_atoms = registry.num_atoms();
        let (input_masks, output_masks, aux_to_external) = external_masks(&program, registry);

        // Positive dependency graph: head -> positive ordinary body,
        // head -> positive external auxiliary, auxiliary -> input atom.
        let mut adj: Vec<Vec<AtomId>> = vec![Vec::new(); num_atoms];
        let mut self_loop = vec![false; num_atoms];
        let mut add_edge = |from: AtomId, to: AtomId| {
            if from == to {
                self_loop[from as usize] = true;
            } else {
                adj[from as usize].push(to);
            }
        };

        for rule in &program.rules {
            for &h in &rule.head {
                for &b in &rule.body_pos {
                    add_edge(h, b);
                }
                for l in &rule.body_ext {
                    if l.positive {
                        add_edge(h, l.aux);
                    }
                }
            }
        }
        for (e, outputs) in output_masks.iter().enumerate() {
            for aux in outputs.iter() {
                for input in input_masks[e].iter() {
                    add_edge(aux, input);
                }
            }
        }

        let sccs = tarjan_sccs(num_atoms, &adj);

        let mut component_of = vec![None; num_atoms];
        let mut components = Vec::with_capacity(sccs.len());
        for scc in sccs {
            let idx = components.len();
            let mut atoms = Interpretation::new();
            let nontrivial = scc.len() > 1 || self_loop[scc[0] as usize];
            let mut contains_aux = false;
            for &a in &scc {
                atoms.set(a);
                component_of[a as usize] = Some(idx);
                contains_aux |= registry.is_external_aux(a);
            }
            components.push(Component {
                atoms,
                rules: Vec::new(),
                head_cycles: false,
                e_cycles: nontrivial && contains_aux,
            });
        }

        for (id, rule) in program.rules.iter().enumerate() {
            let mut touched: Vec<usize> = Vec::new();
            for &h in &rule.head {
                if let Some(c) = component_of[h as usize] {
                    if !touched.contains(&c) {
                        touched.push(c);
                        components[c].rules.push(id as RuleId);
                    } else {
                        // Second head atom in the same component.
                        components[c].head_cycles = true;
                    }
                }
            }
        }

        let head_cycles = components.iter().any(|c| c.head_cycles);
        let e_cycles = components.iter().any(|c| c.e_cycles);
        debug!(
            components = components.len(),
            head_cycles, e_cycles, "annotated ground program"
        );

        Self {
            program,
            num_atoms,
            components,
            component_of,
            head_cycles,
            e_cycles,
            aux_to_external,
            input_masks,
            output_masks,
        }
    }

    /// Builds from annotations precomputed upstream. Global cycle flags
    /// are derived from the per-component flags.
    #[must_use]
    pub fn from_parts(
        program: GroundProgram,
        num_atoms: usize,
        components: Vec<Component>,
        component_of: Vec<Option<usize>>,
        aux_to_external: HashMap<AtomId, Vec<ExternalAtomId>>,
        input_masks: Vec<Interpretation>,
        output_masks: Vec<Interpretation>,
    ) -> Self {
        let head_cycles = components.iter().any(|c| c.head_cycles);
        let e_cycles = components.iter().any(|c| c.e_cycles);
        Self {
            program,
            num_atoms,
            components,
            component_of,
            head_cycles,
            e_cycles,
            aux_to_external,
            input_masks,
            output_masks,
        }
    }

    /// Accumulates additional rules, facts, and external atoms, then
    /// re-derives all annotations. Atom addresses never move. External
    /// atoms of the extension are appended, so the extension must have
    /// been registered against the combined external-atom table.
    #[must_use]
    pub fn extend(&self, additional: &GroundProgram, registry: &Registry) -> Self {
        let mut combined = self.program.clone();
        combined.externals.extend(additional.externals.iter().cloned());
        combined.rules.extend(additional.rules.iter().cloned());
        combined.edb.union_with(&additional.edb);
        Self::analyze(combined, registry)
    }

    /// The underlying program.
    #[must_use]
    pub fn program(&self) -> &GroundProgram {
        &self.program
    }

    /// Registry size this analysis was made against.
    #[must_use]
    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// All components.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// One component.
    #[must_use]
    pub fn component(&self, index: usize) -> &Component {
        &self.components[index]
    }

    /// Component index of an atom, if the atom was known at analysis time.
    #[must_use]
    pub fn component_of(&self, atom: AtomId) -> Option<usize> {
        self.component_of.get(atom as usize).copied().flatten()
    }

    /// Whether any component has head cycles.
    #[must_use]
    pub fn has_head_cycles(&self) -> bool {
        self.head_cycles
    }

    /// Whether any component has cycles through external auxiliaries.
    #[must_use]
    pub fn has_e_cycles(&self) -> bool {
        self.e_cycles
    }

    /// Whether the program mentions external atoms at all.
    #[must_use]
    pub fn has_externals(&self) -> bool {
        !self.program.externals.is_empty()
    }

    /// External atoms whose output includes the auxiliary.
    #[must_use]
    pub fn externals_of_aux(&self, aux: AtomId) -> &[ExternalAtomId] {
        self.aux_to_external
            .get(&aux)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ordinary atoms feeding the predicate inputs of an external atom.
    #[must_use]
    pub fn input_mask(&self, external: ExternalAtomId) -> &Interpretation {
        &self.input_masks[external as usize]
    }

    /// Positive-replacement auxiliaries of an external atom.
    #[must_use]
    pub fn output_mask(&self, external: ExternalAtomId) -> &Interpretation {
        &self.output_masks[external as usize]
    }
}

/// Per-external input/output masks and the auxiliary index.
#[allow(clippy::type_complexity)]
fn external_masks(
    program: &GroundProgram,
    registry: &Registry,
) -> (
    Vec<Interpretation>,
    Vec<Interpretation>,
    HashMap<AtomId, Vec<ExternalAtomId>>,
) {
    let n = program.externals.len();
    let mut input_masks = vec![Interpretation::new(); n];
    let mut output_masks = vec![Interpretation::new(); n];
    let mut aux_to_external: HashMap<AtomId, Vec<ExternalAtomId>> = HashMap::new();

    for atom in 0..registry.num_atoms() as AtomId {
        match registry.info(atom) {
            AtomInfo::Ordinary { predicate, .. } => {
                for (e, ext) in program.externals.iter().enumerate() {
                    if ext.predicate_inputs().any(|p| p == *predicate) {
                        input_masks[e].set(atom);
                    }
                }
            }
            AtomInfo::ExternalAux {
                external,
                negative: false,
                ..
            } => {
                if (*external as usize) < n {
                    output_masks[*external as usize].set(atom);
                    aux_to_external.entry(atom).or_default().push(*external);
                }
            }
            AtomInfo::ExternalAux { negative: true, .. } => {}
        }
    }

    (input_masks, output_masks, aux_to_external)
}

/// Iterative Tarjan SCC decomposition. Returns components over all
/// vertices, including trivial ones.
fn tarjan_sccs(n: usize, adj: &[Vec<AtomId>]) -> Vec<Vec<AtomId>> {
    const UNDEF: u32 = u32::MAX;

    let mut index = vec![UNDEF; n];
    let mut low = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<AtomId> = Vec::new();
    let mut next = 0u32;
    let mut sccs = Vec::new();
    let mut work: Vec<(AtomId, usize)> = Vec::new();

    for start in 0..n as AtomId {
        if index[start as usize] != UNDEF {
            continue;
        }
        work.push((start, 0));
        while let Some(&(v, child)) = work.last() {
            if child == 0 {
                index[v as usize] = next;
                low[v as usize] = next;
                next += 1;
                stack.push(v);
                on_stack[v as usize] = true;
            }
            if child < adj[v as usize].len() {
                if let Some(top) = work.last_mut() {
                    top.1 += 1;
                }
                let w = adj[v as usize][child];
                if index[w as usize] == UNDEF {
                    work.push((w, 0));
                } else if on_stack[w as usize] {
                    low[v as usize] = low[v as usize].min(index[w as usize]);
                }
            } else {
                if low[v as usize] == index[v as usize] {
                    let mut scc = Vec::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack underflow");
                        on_stack[w as usize] = false;
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    sccs.push(scc);
                }
                work.pop();
                if let Some(&(p, _)) = work.last() {
                    low[p as usize] = low[p as usize].min(low[v as usize]);
                }
            }
        }
    }

    sccs
}
