use super::{config::QConfig, explorer::EpsilonGreedy};
use crate::{
    algorithm::Algorithm,
    base::TensorBatch,
    model::SubNet,
    registry::ParamRegistry,
};
use anyhow::{bail, Result};
use candle_core::{shape::D, DType, Tensor};
use candle_nn::VarBuilder;
use serde::{de::DeserializeOwned, Serialize};
use tandem_core::{ActionSpec, ModelSpec};

/// Generic action-value algorithm with a target network.
///
/// The online network selects actions and is trained; the target network
/// provides the bootstrap values and tracks the online parameters every
/// `target_update_interval` steps. Both live in the model's variable map
/// under the `q` and `tgt` prefixes.
///
/// The algorithm requires exactly one declared discrete action holding a
/// single choice per step. When a batch carries no explicit successor
/// states, its rows are treated as a temporally consistent sequence and the
/// final row only serves as the successor of its predecessor.
pub struct QAlgorithm<N>
where
    N: SubNet<Input = Tensor, Output = Tensor>,
{
    q: N,
    q_tgt: N,
    action_name: String,
    action_shape: Vec<usize>,
    discount: f64,
    target_update_interval: u64,
    update_target_weight: f64,
    clip_loss: f64,
    last_target_update: u64,
    explorer: EpsilonGreedy,
}

/// Flattens every state to two dimensions and concatenates along the
/// feature axis.
fn concat_states(states: &[(String, Tensor)]) -> Result<Tensor> {
    let flat = states
        .iter()
        .map(|(_, t)| t.flatten_from(1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Tensor::cat(&flat, D::Minus1)?)
}

impl<N> Algorithm for QAlgorithm<N>
where
    N: SubNet<Input = Tensor, Output = Tensor> + Send,
    N::Config: Clone + DeserializeOwned + Serialize,
{
    type Config = QConfig<N::Config>;

    const SUPPORTS_DISCRETE: bool = true;
    const SUPPORTS_CONTINUOUS: bool = false;

    fn build(
        vb: VarBuilder,
        spec: &ModelSpec,
        config: &Self::Config,
        discount: f64,
    ) -> Result<Self> {
        let (action_name, action_shape) = match spec.actions.as_slice() {
            [(name, ActionSpec::Discrete { shape, .. })]
                if shape.iter().product::<usize>() <= 1 =>
            {
                (name.clone(), shape.clone())
            }
            _ => bail!("q-learning requires exactly one scalar discrete action"),
        };
        if spec.states.is_empty() {
            bail!("q-learning requires at least one state input");
        }

        let q = N::build(vb.pp("q"), &config.net_config)?;
        let q_tgt = N::build(vb.pp("tgt"), &config.net_config)?;

        Ok(Self {
            q,
            q_tgt,
            action_name,
            action_shape,
            discount,
            target_update_interval: config.target_update_interval,
            update_target_weight: config.update_target_weight,
            clip_loss: config.clip_loss,
            last_target_update: 0,
            explorer: EpsilonGreedy::new(config.epsilon, config.seed),
        })
    }

    fn actions(
        &mut self,
        states: &[(String, Tensor)],
        internals: &[Tensor],
        deterministic: bool,
    ) -> Result<(Vec<(String, Tensor)>, Vec<Tensor>)> {
        let x = concat_states(states)?;
        let values = self.q.forward(&x)?;
        let picks = if deterministic {
            values.argmax_keepdim(D::Minus1)?.to_dtype(DType::I64)?
        } else {
            self.explorer.pick(&values)?
        };

        let (batch, _) = picks.dims2()?;
        let mut dims = vec![batch];
        dims.extend_from_slice(&self.action_shape);
        let picks = picks.reshape(dims)?;

        Ok((
            vec![(self.action_name.clone(), picks)],
            internals.to_vec(),
        ))
    }

    fn loss_per_instance(&self, batch: &TensorBatch) -> Result<Tensor> {
        let n = batch.len()?;
        let action = batch
            .actions
            .iter()
            .find(|(name, _)| name == &self.action_name)
            .map(|(_, t)| t);
        let action = match action {
            Some(t) => t,
            None => bail!("batch carries no value for action '{}'", self.action_name),
        };

        let (x, act, rewards, terminals, x_next) = match &batch.next_states {
            Some(next) => (
                concat_states(&batch.states)?,
                action.clone(),
                batch.rewards.clone(),
                batch.terminals.clone(),
                concat_states(next)?,
            ),
            None => {
                // Temporally consistent sequence: successors are the rows
                // shifted by one, the final row has none.
                if n < 2 {
                    bail!("temporally consistent batches need at least two rows");
                }
                let m = n - 1;
                let x = concat_states(&batch.states)?;
                (
                    x.narrow(0, 0, m)?,
                    action.narrow(0, 0, m)?,
                    batch.rewards.narrow(0, 0, m)?,
                    batch.terminals.narrow(0, 0, m)?,
                    x.narrow(0, 1, m)?,
                )
            }
        };
        let m = rewards.dims1()?;

        let q_pred = {
            let values = self.q.forward(&x)?;
            let index = act.reshape((m, 1))?;
            values.gather(&index, D::Minus1)?.squeeze(D::Minus1)?
        };
        let q_next = self.q_tgt.forward(&x_next)?.max(D::Minus1)?;

        let target = (&rewards
            + (terminals.affine(-self.discount, self.discount)? * q_next)?)?
            .detach();
        let delta = (target - q_pred)?;
        let squared = delta.sqr()?;

        if self.clip_loss > 0.0 {
            let abs = delta.abs()?;
            let small = abs.lt(self.clip_loss)?.to_dtype(DType::F32)?;
            let large = small.affine(-1.0, 1.0)?;
            let linear =
                ((self.clip_loss * &abs)? - 0.5 * self.clip_loss * self.clip_loss)?;
            Ok(((small * (0.5 * squared)?)? + (large * linear)?)?)
        } else {
            Ok(squared)
        }
    }

    fn on_build(&mut self, params: &ParamRegistry) -> Result<()> {
        // Start from a target network identical to the online one.
        params
            .filter_prefix("tgt.")
            .track_from(&params.filter_prefix("q."), 1.0)
    }

    fn on_update(&mut self, params: &ParamRegistry, local_step: u64) -> Result<()> {
        if local_step > self.last_target_update + self.target_update_interval {
            self.last_target_update = local_step;
            let target = params.filter_prefix("tgt.");
            let online = params.filter_prefix("q.");
            target.track_from(&online, self.update_target_weight)?;
        }
        Ok(())
    }
}
