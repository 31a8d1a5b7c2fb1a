#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingMesh,
    LoadingBasis,
    Initializing,
    Stepping,
    Reporting,
    Completed,
    Failed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingMesh => "loading mesh",
            RunStage::LoadingBasis => "loading basis",
            RunStage::Initializing => "initializing",
            RunStage::Stepping => "stepping",
            RunStage::Reporting => "reporting",
            RunStage::Completed => "completed",
            RunStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepProgress {
    pub step: u64,
    pub t: f64,
    pub t_end: f64,
    pub fraction_complete: f64,
    /// Set on the step that closed a simulated second.
    pub closed_cycle: Option<u32>,
    pub status_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub step: Option<StepProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            step: None,
        }
    }
}
