use ndarray::{ArrayD, IxDyn};
use tandem::{
    record::BufferedRecorder, Action, ExperienceBatch, Mlp, MlpConfig, ModelBase, ModelConfig,
    ModelSpec, OptimizerConfig, QAlgorithm, QConfig,
};
use tempdir::TempDir;

type QModel = ModelBase<QAlgorithm<Mlp>>;

fn model_config() -> ModelConfig<QConfig<MlpConfig>> {
    let spec = ModelSpec::new()
        .state("obs", vec![4])
        .discrete_action("act", vec![1], 3);
    ModelConfig::new(spec, QConfig::new(MlpConfig::new(4, vec![16], 3)))
        .opt_config(OptimizerConfig::Sgd { lr: 0.01 })
}

fn obs(offset: f32) -> Vec<(String, ArrayD<f32>)> {
    vec![(
        "obs".to_string(),
        ArrayD::from_shape_vec(IxDyn(&[4]), (0..4).map(|v| offset + v as f32).collect())
            .unwrap(),
    )]
}

fn batch(n: usize) -> ExperienceBatch {
    ExperienceBatch {
        states: vec![(
            "obs".to_string(),
            ArrayD::from_shape_vec(IxDyn(&[n, 4]), (0..n * 4).map(|v| v as f32 * 0.1).collect())
                .unwrap(),
        )],
        actions: vec![(
            "act".to_string(),
            Action::Discrete(
                ArrayD::from_shape_vec(IxDyn(&[n, 1]), (0..n).map(|v| (v % 3) as i64).collect())
                    .unwrap(),
            ),
        )],
        rewards: (0..n).map(|v| v as f32 * 0.5).collect(),
        terminals: (0..n).map(|v| v % 4 == 3).collect(),
        internals: vec![],
        next_states: None,
    }
}

#[test]
fn test_discrete_action_within_range() {
    let mut model = QModel::build(model_config()).unwrap();

    for i in 0..10 {
        let deterministic = i % 2 == 0;
        let (actions, internals) = model.action(&obs(i as f32), &[], deterministic).unwrap();
        assert!(internals.is_empty());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].0, "act");

        let value = actions[0].1.as_discrete().unwrap();
        assert_eq!(value.shape(), &[1]);
        let choice = value[IxDyn(&[0])];
        assert!((0..3).contains(&choice));
    }
    assert_eq!(model.local_step(), 10);
}

#[test]
fn test_update_returns_mean_loss() {
    let mut model = QModel::build(model_config()).unwrap();

    let (loss, per_instance) = model.update(&batch(6)).unwrap().unwrap();
    // Shifted batches score one transition per row but the last.
    assert_eq!(per_instance.len(), 5);
    let mean: f32 = per_instance.iter().sum::<f32>() / per_instance.len() as f32;
    assert!((loss - mean).abs() < 1e-5);
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new("tandem").unwrap();
    let path = dir.path().join("model.safetensors");

    let mut model = QModel::build(model_config()).unwrap();
    let saved = model.params().flat_values().unwrap();
    model.save(&path, false).unwrap();

    // Updates move the parameters away from the snapshot...
    model.update(&batch(4)).unwrap();
    assert_ne!(model.params().flat_values().unwrap(), saved);

    // ...and loading restores them exactly.
    model.load(&path).unwrap();
    assert_eq!(model.params().flat_values().unwrap(), saved);
}

#[test]
fn test_save_with_step_suffix() {
    let dir = TempDir::new("tandem").unwrap();
    let path = dir.path().join("model.safetensors");

    let mut model = QModel::build(model_config()).unwrap();
    for _ in 0..3 {
        model.action(&obs(0.0), &[], true).unwrap();
    }
    model.save(&path, true).unwrap();

    assert!(dir.path().join("model.safetensors-3").exists());
}

#[test]
fn test_summary_gating() {
    let recorder = BufferedRecorder::new();
    let mut model = QModel::build(model_config().summary_interval(5)).unwrap();
    model.set_recorder(Box::new(recorder.clone()));

    // The first update always writes.
    model.update(&batch(4)).unwrap();
    assert_eq!(recorder.len(), 1);

    // No further write until the interval elapsed.
    model.update(&batch(4)).unwrap();
    assert_eq!(recorder.len(), 1);

    for _ in 0..6 {
        model.action(&obs(0.0), &[], true).unwrap();
    }
    model.update(&batch(4)).unwrap();
    assert_eq!(recorder.len(), 2);

    let records = recorder.records();
    let (step, record) = &records[1];
    assert_eq!(*step, 6);
    assert!(record.get_scalar("loss/total").is_ok());
    assert!(record.get_array1("loss/per_instance").is_ok());
}

#[test]
fn test_no_summaries_without_recorder() {
    let mut model = QModel::build(model_config()).unwrap();
    assert!(!model.summaries_due());
    model.update(&batch(4)).unwrap();
}

#[test]
fn test_episode_reward_summary() {
    let recorder = BufferedRecorder::new();
    let mut model = QModel::build(model_config()).unwrap();
    model.set_recorder(Box::new(recorder.clone()));

    model.action(&obs(0.0), &[], true).unwrap();
    model.write_episode_reward_summary(12.5);

    let records = recorder.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, 1);
    assert_eq!(records[0].1.get_scalar("episode_reward").unwrap(), 12.5);
}

#[test]
fn test_continuous_action_rejected() {
    let spec = ModelSpec::new()
        .state("obs", vec![4])
        .continuous_action("act", vec![1], -1.0, 1.0);
    let config = ModelConfig::new(spec, QConfig::new(MlpConfig::new(4, vec![16], 3)));
    assert!(QModel::build(config).is_err());
}

#[test]
fn test_standalone_requires_optimizer() {
    assert!(QModel::build(model_config().strip_optimizer()).is_err());
}

#[test]
fn test_missing_state_input() {
    let mut model = QModel::build(model_config()).unwrap();
    let wrong = vec![(
        "observation".to_string(),
        ArrayD::from_shape_vec(IxDyn(&[4]), vec![0.0; 4]).unwrap(),
    )];
    assert!(model.action(&wrong, &[], true).is_err());
}

#[test]
fn test_wrong_state_shape() {
    let mut model = QModel::build(model_config()).unwrap();
    let wrong = vec![(
        "obs".to_string(),
        ArrayD::from_shape_vec(IxDyn(&[5]), vec![0.0; 5]).unwrap(),
    )];
    assert!(model.action(&wrong, &[], true).is_err());
}
