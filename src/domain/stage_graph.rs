use crate::domain::listing::Stage;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Actor roles authorized to execute transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Exporter,
    Inspector,
    Packer,
    Trucker,
    WarehouseOperator,
    DocumentationAgent,
    Buyer,
    Financier,
    System,
}

impl Role {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "exporter" => Ok(Role::Exporter),
            "inspector" => Ok(Role::Inspector),
            "packer" => Ok(Role::Packer),
            "trucker" => Ok(Role::Trucker),
            "warehouse_operator" => Ok(Role::WarehouseOperator),
            "documentation_agent" => Ok(Role::DocumentationAgent),
            "buyer" => Ok(Role::Buyer),
            "financier" => Ok(Role::Financier),
            "system" => Ok(Role::System),
            other => Err(EngineError::Validation(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Exporter => "exporter",
            Role::Inspector => "inspector",
            Role::Packer => "packer",
            Role::Trucker => "trucker",
            Role::WarehouseOperator => "warehouse_operator",
            Role::DocumentationAgent => "documentation_agent",
            Role::Buyer => "buyer",
            Role::Financier => "financier",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

/// One ancillary-service stage definition.
#[derive(Debug, Clone)]
pub struct StageNode {
    pub stage: Stage,
    pub prerequisites: BTreeSet<Stage>,
    pub roles: BTreeSet<Role>,
    pub triggers_financing: bool,
}

/// Static, acyclic dependency graph over the ancillary-service stages.
///
/// Built once at startup and shared read-only; `new` validates the graph and
/// fails fast with `MalformedGraph` on a cycle or a dangling prerequisite.
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: BTreeMap<Stage, StageNode>,
}

impl StageGraph {
    pub fn new(nodes: Vec<StageNode>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for node in nodes {
            if !node.stage.is_service() {
                return Err(EngineError::MalformedGraph(format!(
                    "{} is not a completable service stage",
                    node.stage
                )));
            }
            if map.insert(node.stage, node).is_some() {
                return Err(EngineError::MalformedGraph(
                    "duplicate stage definition".to_string(),
                ));
            }
        }
        let graph = Self { nodes: map };
        graph.validate()?;
        Ok(graph)
    }

    /// The standard DGE service graph: everything hangs off inspection, and
    /// buyer swap additionally needs documentation and trucking.
    pub fn standard() -> Self {
        let node = |stage, prereqs: &[Stage], roles: &[Role], financing| StageNode {
            stage,
            prerequisites: prereqs.iter().copied().collect(),
            roles: roles.iter().copied().collect(),
            triggers_financing: financing,
        };
        // Validated shape, cannot fail.
        Self::new(vec![
            node(Stage::Inspection, &[], &[Role::Inspector], true),
            node(Stage::Packaging, &[Stage::Inspection], &[Role::Packer], false),
            node(Stage::Trucking, &[Stage::Inspection], &[Role::Trucker], false),
            node(
                Stage::Warehousing,
                &[Stage::Inspection],
                &[Role::WarehouseOperator],
                false,
            ),
            node(
                Stage::Documentation,
                &[Stage::Inspection],
                &[Role::DocumentationAgent],
                false,
            ),
            node(
                Stage::BuyerSwap,
                &[Stage::Inspection, Stage::Documentation, Stage::Trucking],
                &[Role::Buyer],
                false,
            ),
        ])
        .expect("standard stage graph is well-formed")
    }

    fn node(&self, stage: Stage) -> Result<&StageNode> {
        self.nodes
            .get(&stage)
            .ok_or_else(|| EngineError::InvalidStage(stage.to_string()))
    }

    pub fn prerequisites_of(&self, stage: Stage) -> Result<&BTreeSet<Stage>> {
        Ok(&self.node(stage)?.prerequisites)
    }

    pub fn authorized_roles(&self, stage: Stage) -> Result<&BTreeSet<Role>> {
        Ok(&self.node(stage)?.roles)
    }

    pub fn triggers_financing(&self, stage: Stage) -> Result<bool> {
        Ok(self.node(stage)?.triggers_financing)
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.nodes.keys().copied()
    }

    /// Depth-first cycle and dangling-edge check.
    fn validate(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: BTreeMap<Stage, Mark> = BTreeMap::new();

        fn visit(
            graph: &StageGraph,
            stage: Stage,
            marks: &mut BTreeMap<Stage, Mark>,
        ) -> Result<()> {
            match marks.get(&stage) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(EngineError::MalformedGraph(format!(
                        "cycle through {stage}"
                    )));
                }
                None => {}
            }
            marks.insert(stage, Mark::Visiting);
            let node = graph.nodes.get(&stage).ok_or_else(|| {
                EngineError::MalformedGraph(format!("prerequisite {stage} is not defined"))
            })?;
            for prereq in &node.prerequisites {
                visit(graph, *prereq, marks)?;
            }
            marks.insert(stage, Mark::Done);
            Ok(())
        }

        for stage in self.nodes.keys().copied().collect::<Vec<_>>() {
            visit(self, stage, &mut marks)?;
        }
        Ok(())
    }
}
