//! Translation of backend task results into pipeline containers.

use std::sync::Arc;

use tracing::debug;

use crate::backend::TaskResult;
use crate::containers::RemoteFsPath;
use crate::filter::PathFilter;
use crate::reporting::MessageSink;
use crate::state::PipelineState;

/// Filters each task's saved paths and republishes the survivors.
///
/// Task results are walked in the order the backend returned them; the same
/// path reported by two different tasks is published twice. The hostname is
/// always the input artifact's, never derived from the output path.
pub struct ResultAggregator {
    filter: PathFilter,
    state: Arc<PipelineState>,
    messages: Arc<dyn MessageSink>,
}

impl ResultAggregator {
    pub fn new(
        filter: PathFilter,
        state: Arc<PipelineState>,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            filter,
            state,
            messages,
        }
    }

    pub fn aggregate(&self, results: &[TaskResult], hostname: &str) -> Vec<RemoteFsPath> {
        let mut published = Vec::new();
        for task in results {
            for path in task.saved_paths.as_deref().unwrap_or_default() {
                if !self.filter.accept(path) {
                    debug!("skipping {} from task {}", path, task.name);
                    continue;
                }
                self.messages
                    .publish_message(&format!("  {}: {}", task.name, path));
                let container = RemoteFsPath::new(hostname, path);
                self.state.store_container(container.clone());
                published.push(container);
            }
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::ResultAggregator;
    use crate::backend::TaskResult;
    use crate::filter::PathFilter;
    use crate::reporting::MessageSink;
    use crate::state::PipelineState;
    use std::sync::{Arc, Mutex};

    struct RecordingMessages {
        lines: Mutex<Vec<String>>,
    }

    impl MessageSink for RecordingMessages {
        fn publish_message(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    fn aggregator() -> (ResultAggregator, Arc<PipelineState>, Arc<RecordingMessages>) {
        let state = Arc::new(PipelineState::new());
        let messages = Arc::new(RecordingMessages {
            lines: Mutex::new(Vec::new()),
        });
        let aggregator = ResultAggregator::new(
            PathFilter::new("/tmp/scratch", ".plaso"),
            state.clone(),
            messages.clone(),
        );
        (aggregator, state, messages)
    }

    fn task(name: &str, paths: &[&str]) -> TaskResult {
        TaskResult {
            name: name.to_string(),
            saved_paths: Some(paths.iter().map(|p| p.to_string()).collect()),
        }
    }

    #[test]
    fn publishes_only_matching_paths_with_input_hostname() {
        let (aggregator, state, messages) = aggregator();
        let results = vec![task(
            "t1",
            &["/tmp/scratch/a.tmp", "/eat/data/out.plaso"],
        )];

        let published = aggregator.aggregate(&results, "h1");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].path, "/eat/data/out.plaso");
        assert_eq!(published[0].hostname, "h1");
        assert_eq!(state.containers(), published);
        assert_eq!(
            messages.lines.lock().unwrap().as_slice(),
            ["  t1: /eat/data/out.plaso"]
        );
    }

    #[test]
    fn absent_saved_paths_yield_nothing() {
        let (aggregator, state, _messages) = aggregator();
        let results = vec![TaskResult {
            name: "t1".to_string(),
            saved_paths: None,
        }];
        let published = aggregator.aggregate(&results, "h1");
        assert!(published.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn same_path_from_two_tasks_publishes_twice() {
        let (aggregator, state, _messages) = aggregator();
        let results = vec![
            task("t1", &["/out/a.plaso"]),
            task("t2", &["/out/a.plaso"]),
        ];
        let published = aggregator.aggregate(&results, "h1");
        assert_eq!(published.len(), 2);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn preserves_task_order() {
        let (aggregator, _state, messages) = aggregator();
        let results = vec![
            task("t2", &["/out/b.plaso"]),
            task("t1", &["/out/a.plaso"]),
        ];
        aggregator.aggregate(&results, "h1");
        assert_eq!(
            messages.lines.lock().unwrap().as_slice(),
            ["  t2: /out/b.plaso", "  t1: /out/a.plaso"]
        );
    }

    #[test]
    fn repeated_aggregation_is_structurally_equal() {
        let (aggregator, state, _messages) = aggregator();
        let results = vec![task("t1", &["/out/a.plaso", "/out/b.plaso"])];
        let first = aggregator.aggregate(&results, "h1");
        let second = aggregator.aggregate(&results, "h1");
        assert_eq!(first, second);
        assert_eq!(state.len(), 4);
    }
}
