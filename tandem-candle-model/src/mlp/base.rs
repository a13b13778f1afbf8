use super::MlpConfig;
use crate::model::SubNet;
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Multilayer perceptron with ReLU activations on the hidden layers and a
/// linear final layer.
pub struct Mlp {
    layers: Vec<Linear>,
}

impl SubNet for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: &MlpConfig) -> Result<Self> {
        let mut dims = Vec::with_capacity(config.units.len() + 2);
        dims.push(config.in_dim);
        dims.extend_from_slice(&config.units);
        dims.push(config.out_dim);

        let mut layers = Vec::with_capacity(dims.len() - 1);
        for (i, pair) in dims.windows(2).enumerate() {
            layers.push(linear(pair[0], pair[1], vb.pp(format!("ln{}", i)))?);
        }
        Ok(Self { layers })
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let mut xs = input.clone();
        let n_layers = self.layers.len();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < n_layers {
                xs = xs.relu()?;
            }
        }
        Ok(xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    #[test]
    fn test_output_shape() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, &MlpConfig::new(4, vec![8, 8], 2)).unwrap();

        let x = Tensor::zeros((5, 4), DType::F32, &Device::Cpu).unwrap();
        let y = mlp.forward(&x).unwrap();
        assert_eq!(y.dims(), &[5, 2]);

        // in->8, 8->8, 8->out, each with weight and bias
        assert_eq!(varmap.data().lock().unwrap().len(), 6);
    }
}
