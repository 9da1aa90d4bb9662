//! Task-type display names.

/// Map a task-type identifier to its display name.
///
/// The seven types here are the ones the backend emits today; anything else
/// falls through to the raw identifier so new backend task types degrade
/// gracefully instead of disappearing.
pub fn task_type_label(task_type: &str) -> &str {
    match task_type {
        "interview_generation" => "Interview question generation",
        "resume_upload" => "Resume upload",
        "resume_parse" => "Resume parsing",
        "resume_optimize" => "Resume optimization",
        "knowledge_upload" => "Knowledge base upload",
        "evaluation_generate" => "Evaluation report generation",
        "job_match" => "Job match analysis",
        other => other,
    }
}
