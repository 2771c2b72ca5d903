use wl_locate::Phase;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStage {
    LoadingProject,
    CompilingNetwork,
    GeneratingScenario,
    Refining,
    NearOptima,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingProject => "loading project",
            RunStage::CompilingNetwork => "compiling network",
            RunStage::GeneratingScenario => "generating scenario",
            RunStage::Refining => "refining",
            RunStage::NearOptima => "near-optima",
            RunStage::SavingResults => "saving results",
            RunStage::Completed => "completed",
        }
    }
}

/// Where the localization loop currently is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocateProgress {
    pub iteration: usize,
    pub total_iterations: usize,
    pub window: Option<usize>,
    pub phase: Option<Phase>,
    pub round: Option<usize>,
    pub objective: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub locate: Option<LocateProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            locate: None,
        }
    }
}
