// 全ジョブ実行

use tracing::error;

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobResult>> {
    jobs.iter()
        .map(|job| {
            let result = run_job(job);
            if let Err(e) = &result {
                error!(input = %job.input_path.display(), error = %e, "job failed");
            }
            result
        })
        .collect()
}
