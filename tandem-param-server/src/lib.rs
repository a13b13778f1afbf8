//! Asynchronous parameter-server training for tandem models.
//!
//! One [`GlobalModel`] holds the canonical parameters and the shared
//! timestep/episode counters. Any number of [`WorkerReplica`]s hold their
//! own parameter copies; each computes gradients against its own copy,
//! applies them to the global parameters and refreshes its copy from
//! global, all without taking a lock. Workers therefore act on views that
//! may lag other workers' pushes; throughput is bought by accepting that
//! staleness.
//!
//! Each worker is expected to run on its own thread, driving its
//! `action`/`update` cycle sequentially. The global parameters and the two
//! counters are the only mutable state shared across workers.
use anyhow::Result;
use tandem_candle_model::{Algorithm, ModelConfig};

mod global;
mod worker;

pub use global::GlobalModel;
pub use worker::WorkerReplica;

/// Builds a global parameter holder together with its first worker replica
/// from one configuration.
///
/// The global model is built from the same configuration with the
/// optimizer removed; the worker keeps the optimizer and applies it to the
/// global parameters. Further replicas come from [`GlobalModel::replica`].
pub fn build_pair<A: Algorithm>(
    config: ModelConfig<A::Config>,
) -> Result<(GlobalModel<A>, WorkerReplica<A>)> {
    let global = GlobalModel::build(config.clone())?;
    let worker = global.replica(config)?;
    Ok((global, worker))
}

#[cfg(test)]
mod test {
    use super::build_pair;
    use ndarray::{ArrayD, IxDyn};
    use tandem_candle_model::{
        mlp::{Mlp, MlpConfig},
        q::{QAlgorithm, QConfig},
        ModelConfig, OptimizerConfig,
    };
    use tandem_core::{Action, ExperienceBatch, ModelSpec};
    use test_log::test;

    type Algo = QAlgorithm<Mlp>;

    fn model_config() -> ModelConfig<QConfig<MlpConfig>> {
        let spec = ModelSpec::new()
            .state("obs", vec![3])
            .discrete_action("act", vec![1], 2);
        ModelConfig::new(spec, QConfig::new(MlpConfig::new(3, vec![8], 2)))
            .opt_config(OptimizerConfig::Sgd { lr: 0.01 })
    }

    fn batch(n: usize, offset: f32, terminals: Vec<bool>) -> ExperienceBatch {
        assert_eq!(terminals.len(), n);
        let obs: Vec<f32> = (0..n * 3).map(|v| offset + v as f32 * 0.1).collect();
        ExperienceBatch {
            states: vec![(
                "obs".to_string(),
                ArrayD::from_shape_vec(IxDyn(&[n, 3]), obs).unwrap(),
            )],
            actions: vec![(
                "act".to_string(),
                Action::Discrete(
                    ArrayD::from_shape_vec(
                        IxDyn(&[n, 1]),
                        (0..n).map(|v| (v % 2) as i64).collect(),
                    )
                    .unwrap(),
                ),
            )],
            rewards: vec![1.0; n],
            terminals,
            internals: vec![],
            next_states: None,
        }
    }

    #[test]
    fn test_worker_matches_global_after_update() {
        let (global, mut worker) = build_pair::<Algo>(model_config()).unwrap();

        worker.update(&batch(4, 0.0, vec![false; 4])).unwrap();

        // With no concurrent writer, the pull after the push leaves the
        // replica bit-identical to the global parameters.
        assert_eq!(
            worker.model().params().flat_values().unwrap(),
            global.model().params().flat_values().unwrap(),
        );
    }

    #[test]
    fn test_update_moves_global_parameters() {
        let (global, mut worker) = build_pair::<Algo>(model_config()).unwrap();
        let before = global.model().params().flat_values().unwrap();

        worker.update(&batch(4, 0.0, vec![false; 4])).unwrap();

        let after = global.model().params().flat_values().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_counters_advance_by_batch_size() {
        let (global, mut worker) = build_pair::<Algo>(model_config()).unwrap();

        worker
            .update(&batch(4, 0.0, vec![true, false, false, true]))
            .unwrap();
        assert_eq!(global.timestep(), 4);
        assert_eq!(global.episode(), 2);

        worker.update(&batch(3, 1.0, vec![false, true, false])).unwrap();
        assert_eq!(global.timestep(), 7);
        assert_eq!(global.episode(), 3);
    }

    #[test]
    fn test_two_workers_on_threads() {
        let (global, worker_a) = build_pair::<Algo>(model_config()).unwrap();
        let worker_b = global.replica(model_config()).unwrap();

        let handles = vec![
            (worker_a, batch(3, 0.0, vec![true, false, false])),
            (worker_b, batch(5, 10.0, vec![false, true, true, false, false])),
        ]
        .into_iter()
        .map(|(mut worker, batch)| {
            std::thread::spawn(move || {
                worker.update(&batch).unwrap();
                worker
            })
        })
        .collect::<Vec<_>>();
        let mut workers = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        // Whatever the interleaving, no increment is lost.
        assert_eq!(global.timestep(), 8);
        assert_eq!(global.episode(), 3);

        // With the contention over, one more update leaves its worker
        // bit-identical to the global parameters again.
        workers[0].update(&batch(2, 20.0, vec![false, false])).unwrap();
        assert_eq!(global.timestep(), 10);
        assert_eq!(
            workers[0].model().params().flat_values().unwrap(),
            global.model().params().flat_values().unwrap(),
        );
    }

    #[test]
    fn test_global_holder_update_is_noop() {
        let (mut global, _worker) = build_pair::<Algo>(model_config()).unwrap();
        let result = global
            .model_mut()
            .update(&batch(4, 0.0, vec![false; 4]))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(global.timestep(), 0);
    }

    #[test]
    fn test_replica_requires_optimizer() {
        let (global, _worker) = build_pair::<Algo>(model_config()).unwrap();
        assert!(global.replica(model_config().strip_optimizer()).is_err());
    }

    #[test]
    fn test_replica_starts_from_global_values() {
        let (global, worker) = build_pair::<Algo>(model_config()).unwrap();
        assert_eq!(
            worker.model().params().flat_values().unwrap(),
            global.model().params().flat_values().unwrap(),
        );
    }
}
