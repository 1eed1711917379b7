//! Stacked LSTM regressor trained with backpropagation through time.
//!
//! Layout: LSTM layers (univariate input) → optional dense layers → linear
//! output of `horizon` values. Dropout is applied to every LSTM layer output
//! while training and disabled at inference.

use super::network_config::NetworkConfig;
use crate::domain::errors::PredictorError;
use crate::domain::ports::SequenceModel;
use ndarray::linalg::general_mat_mul;
use ndarray::{Array, Array1, Array2, ArrayView1, Axis, Dimension, Zip, s};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One LSTM layer. Gate blocks are stacked as [input, forget, cell, output].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmLayer {
    /// input -> gates [4H, input]
    w: Array2<f64>,
    /// hidden -> gates [4H, H]
    u: Array2<f64>,
    b: Array1<f64>,
}

/// Everything the backward pass needs from one timestep
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
    h: Array1<f64>,
    c: Array1<f64>,
}

impl LstmLayer {
    fn new(input_size: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden as f64).sqrt();
        let mut b = Array1::zeros(4 * hidden);
        // Forget gate starts open
        b.slice_mut(s![hidden..2 * hidden]).fill(1.0);

        Self {
            w: Array2::from_shape_fn((4 * hidden, input_size), |_| {
                rng.random_range(-limit..limit)
            }),
            u: Array2::from_shape_fn((4 * hidden, hidden), |_| {
                rng.random_range(-limit..limit)
            }),
            b,
        }
    }

    fn hidden(&self) -> usize {
        self.u.ncols()
    }

    fn input_size(&self) -> usize {
        self.w.ncols()
    }

    fn zeros_like(&self) -> Self {
        Self {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    fn step(&self, x: &Array1<f64>, h_prev: &Array1<f64>, c_prev: &Array1<f64>) -> StepCache {
        let hidden = self.hidden();
        let z = self.w.dot(x) + self.u.dot(h_prev) + &self.b;

        let i = z.slice(s![0..hidden]).mapv(sigmoid);
        let f = z.slice(s![hidden..2 * hidden]).mapv(sigmoid);
        let g = z.slice(s![2 * hidden..3 * hidden]).mapv(f64::tanh);
        let o = z.slice(s![3 * hidden..]).mapv(sigmoid);

        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);
        let h = &o * &tanh_c;

        StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
            h,
            c,
        }
    }

    fn forward_sequence(&self, xs: &[Array1<f64>]) -> Vec<StepCache> {
        let mut h = Array1::zeros(self.hidden());
        let mut c = Array1::zeros(self.hidden());
        let mut steps = Vec::with_capacity(xs.len());

        for x in xs {
            let step = self.step(x, &h, &c);
            h = step.h.clone();
            c = step.c.clone();
            steps.push(step);
        }

        steps
    }

    /// Backpropagates `d_out` (gradient wrt each timestep output) and returns
    /// the gradient wrt each timestep input.
    fn backward_sequence(
        &self,
        steps: &[StepCache],
        d_out: &[Array1<f64>],
        grads: &mut LstmLayer,
    ) -> Vec<Array1<f64>> {
        let hidden = self.hidden();
        let mut dh_next = Array1::<f64>::zeros(hidden);
        let mut dc_next = Array1::<f64>::zeros(hidden);
        let mut d_inputs = vec![Array1::<f64>::zeros(self.input_size()); steps.len()];

        for t in (0..steps.len()).rev() {
            let st = &steps[t];
            let dh = &d_out[t] + &dh_next;

            let d_o = &dh * &st.tanh_c;
            let dc = &dh * &st.o * &st.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_f = &dc * &st.c_prev;
            let d_i = &dc * &st.g;
            let d_g = &dc * &st.i;
            dc_next = &dc * &st.f;

            let mut dz = Array1::<f64>::zeros(4 * hidden);
            dz.slice_mut(s![0..hidden])
                .assign(&(&d_i * &st.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![hidden..2 * hidden])
                .assign(&(&d_f * &st.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * hidden..3 * hidden])
                .assign(&(&d_g * &st.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * hidden..])
                .assign(&(&d_o * &st.o.mapv(|v| v * (1.0 - v))));

            accumulate_outer(&mut grads.w, &dz, &st.x);
            accumulate_outer(&mut grads.u, &dz, &st.h_prev);
            grads.b += &dz;

            d_inputs[t] = self.w.t().dot(&dz);
            dh_next = self.u.t().dot(&dz);
        }

        d_inputs
    }
}

/// Fully connected linear layer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    /// [out, in]
    w: Array2<f64>,
    b: Array1<f64>,
}

impl DenseLayer {
    fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        Self {
            w: Array2::from_shape_fn((output_size, input_size), |_| {
                rng.random_range(-limit..limit)
            }),
            b: Array1::zeros(output_size),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            w: Array2::zeros(self.w.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    fn forward(&self, a: &Array1<f64>) -> Array1<f64> {
        self.w.dot(a) + &self.b
    }

    fn backward(&self, a: &Array1<f64>, d: &Array1<f64>, grads: &mut DenseLayer) -> Array1<f64> {
        accumulate_outer(&mut grads.w, d, a);
        grads.b += d;
        self.w.t().dot(d)
    }
}

/// Learnable tensors. The same shape doubles as gradient and Adam moment storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NetworkParams {
    lstm: Vec<LstmLayer>,
    dense: Vec<DenseLayer>,
}

impl NetworkParams {
    fn init(config: &NetworkConfig, horizon: usize, rng: &mut StdRng) -> Self {
        let mut lstm = Vec::with_capacity(config.lstm_units.len());
        let mut input_size = 1;
        for &units in &config.lstm_units {
            lstm.push(LstmLayer::new(input_size, units, rng));
            input_size = units;
        }

        let mut dense = Vec::with_capacity(config.dense_units.len() + 1);
        for &units in config.dense_units.iter().chain(std::iter::once(&horizon)) {
            dense.push(DenseLayer::new(input_size, units, rng));
            input_size = units;
        }

        Self { lstm, dense }
    }

    fn zeros_like(&self) -> Self {
        Self {
            lstm: self.lstm.iter().map(LstmLayer::zeros_like).collect(),
            dense: self.dense.iter().map(DenseLayer::zeros_like).collect(),
        }
    }

    fn accumulate(&mut self, other: &NetworkParams) {
        for (a, b) in self.lstm.iter_mut().zip(&other.lstm) {
            a.w += &b.w;
            a.u += &b.u;
            a.b += &b.b;
        }
        for (a, b) in self.dense.iter_mut().zip(&other.dense) {
            a.w += &b.w;
            a.b += &b.b;
        }
    }

    fn squared_norm(&self) -> f64 {
        let lstm: f64 = self
            .lstm
            .iter()
            .map(|l| sum_sq(&l.w) + sum_sq(&l.u) + sum_sq(&l.b))
            .sum();
        let dense: f64 = self.dense.iter().map(|d| sum_sq(&d.w) + sum_sq(&d.b)).sum();
        lstm + dense
    }

    fn scale(&mut self, factor: f64) {
        for l in &mut self.lstm {
            l.w.mapv_inplace(|v| v * factor);
            l.u.mapv_inplace(|v| v * factor);
            l.b.mapv_inplace(|v| v * factor);
        }
        for d in &mut self.dense {
            d.w.mapv_inplace(|v| v * factor);
            d.b.mapv_inplace(|v| v * factor);
        }
    }

    fn clip_norm(&mut self, max_norm: f64) {
        let norm = self.squared_norm().sqrt();
        if norm > max_norm {
            self.scale(max_norm / norm);
        }
    }
}

/// Adam optimiser state
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: NetworkParams,
    v: NetworkParams,
}

impl Adam {
    fn new(params: &NetworkParams, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            m: params.zeros_like(),
            v: params.zeros_like(),
        }
    }

    fn step(&mut self, params: &mut NetworkParams, grads: &NetworkParams) {
        self.t = self.t.saturating_add(1);
        let hp = AdamStep {
            lr_t: self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
                / (1.0 - self.beta1.powi(self.t)),
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
        };

        let lstm = params
            .lstm
            .iter_mut()
            .zip(&grads.lstm)
            .zip(self.m.lstm.iter_mut().zip(self.v.lstm.iter_mut()));
        for ((p, g), (m, v)) in lstm {
            hp.apply(&mut p.w, &g.w, &mut m.w, &mut v.w);
            hp.apply(&mut p.u, &g.u, &mut m.u, &mut v.u);
            hp.apply(&mut p.b, &g.b, &mut m.b, &mut v.b);
        }

        let dense = params
            .dense
            .iter_mut()
            .zip(&grads.dense)
            .zip(self.m.dense.iter_mut().zip(self.v.dense.iter_mut()));
        for ((p, g), (m, v)) in dense {
            hp.apply(&mut p.w, &g.w, &mut m.w, &mut v.w);
            hp.apply(&mut p.b, &g.b, &mut m.b, &mut v.b);
        }
    }
}

#[derive(Clone, Copy)]
struct AdamStep {
    lr_t: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
}

impl AdamStep {
    fn apply<D: Dimension>(
        self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        m: &mut Array<f64, D>,
        v: &mut Array<f64, D>,
    ) {
        Zip::from(param)
            .and(grad)
            .and(m)
            .and(v)
            .for_each(|p, &g, m, v| {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                *p -= self.lr_t * *m / (v.sqrt() + self.epsilon);
            });
    }
}

/// Forward activations of a single window, kept for backprop
struct Trace {
    lstm_steps: Vec<Vec<StepCache>>,
    dense_inputs: Vec<Array1<f64>>,
    output: Array1<f64>,
}

/// Per-layer dropout masks, [window_len, units] each, already scaled by 1/keep
type DropoutMasks = Vec<Array2<f64>>;

/// LSTM model for one-step (or multi-step) price forecasting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    config: NetworkConfig,
    window_len: usize,
    horizon: usize,
    params: NetworkParams,
}

impl LstmNetwork {
    pub fn new(
        config: NetworkConfig,
        window_len: usize,
        horizon: usize,
    ) -> Result<Self, PredictorError> {
        config.validate()?;
        if window_len == 0 || horizon == 0 {
            return Err(PredictorError::invalid_config(format!(
                "window length and horizon must be positive, got {} and {}",
                window_len, horizon
            )));
        }

        let mut rng = config.rng();
        let params = NetworkParams::init(&config, horizon, &mut rng);
        Ok(Self {
            config,
            window_len,
            horizon,
            params,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Total number of learnable parameters
    pub fn parameter_count(&self) -> usize {
        let lstm: usize = self
            .params
            .lstm
            .iter()
            .map(|l| l.w.len() + l.u.len() + l.b.len())
            .sum();
        let dense: usize = self.params.dense.iter().map(|d| d.w.len() + d.b.len()).sum();
        lstm + dense
    }

    /// Checks that tensors agree with the declared configuration.
    pub fn check_shapes(&self) -> Result<(), PredictorError> {
        let expected_lstm = &self.config.lstm_units;
        let actual_lstm: Vec<usize> = self.params.lstm.iter().map(LstmLayer::hidden).collect();
        let expected_dense: Vec<usize> = self
            .config
            .dense_units
            .iter()
            .copied()
            .chain(std::iter::once(self.horizon))
            .collect();
        let actual_dense: Vec<usize> = self.params.dense.iter().map(|d| d.w.nrows()).collect();

        if &actual_lstm != expected_lstm || actual_dense != expected_dense {
            return Err(PredictorError::invalid_config(format!(
                "network tensors {:?}/{:?} do not match configuration {:?}/{:?}",
                actual_lstm, actual_dense, expected_lstm, expected_dense
            )));
        }
        Ok(())
    }

    fn dropout_masks(&self, rng: &mut StdRng) -> Option<DropoutMasks> {
        let rate = self.config.dropout;
        if rate <= 0.0 {
            return None;
        }
        let keep = 1.0 - rate;
        Some(
            self.params
                .lstm
                .iter()
                .map(|layer| {
                    Array2::from_shape_fn((self.window_len, layer.hidden()), |_| {
                        if rng.random::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    })
                })
                .collect(),
        )
    }

    fn forward_trace(&self, window: ArrayView1<'_, f64>, masks: Option<&[Array2<f64>]>) -> Trace {
        let mut seq: Vec<Array1<f64>> = window.iter().map(|&v| Array1::from_elem(1, v)).collect();
        let mut lstm_steps = Vec::with_capacity(self.params.lstm.len());

        for (l, layer) in self.params.lstm.iter().enumerate() {
            let steps = layer.forward_sequence(&seq);
            seq = steps.iter().map(|st| st.h.clone()).collect();
            if let Some(masks) = masks {
                for (t, h) in seq.iter_mut().enumerate() {
                    *h *= &masks[l].row(t);
                }
            }
            lstm_steps.push(steps);
        }

        let last_hidden = self.params.lstm.last().map_or(0, LstmLayer::hidden);
        let mut activation = seq.pop().unwrap_or_else(|| Array1::zeros(last_hidden));
        let mut dense_inputs = Vec::with_capacity(self.params.dense.len());
        for layer in &self.params.dense {
            let next = layer.forward(&activation);
            dense_inputs.push(activation);
            activation = next;
        }

        Trace {
            lstm_steps,
            dense_inputs,
            output: activation,
        }
    }

    fn backward_trace(
        &self,
        trace: &Trace,
        d_output: Array1<f64>,
        masks: Option<&[Array2<f64>]>,
        grads: &mut NetworkParams,
    ) {
        let mut d = d_output;
        for (k, layer) in self.params.dense.iter().enumerate().rev() {
            d = layer.backward(&trace.dense_inputs[k], &d, &mut grads.dense[k]);
        }

        // Only the last timestep of the top LSTM layer feeds the head
        let mut d_seq: Vec<Array1<f64>> = trace
            .lstm_steps
            .last()
            .map(|steps| vec![Array1::zeros(d.len()); steps.len()])
            .unwrap_or_default();
        if let Some(last) = d_seq.last_mut() {
            *last = d;
        }

        for l in (0..self.params.lstm.len()).rev() {
            if let Some(masks) = masks {
                for (t, dh) in d_seq.iter_mut().enumerate() {
                    *dh *= &masks[l].row(t);
                }
            }
            d_seq = self.params.lstm[l].backward_sequence(
                &trace.lstm_steps[l],
                &d_seq,
                &mut grads.lstm[l],
            );
        }
    }

    /// Gradient of `sum((y - t)^2) / normaliser` for one window, plus its raw SSE.
    fn sample_gradients(
        &self,
        window: ArrayView1<'_, f64>,
        target: ArrayView1<'_, f64>,
        masks: Option<&[Array2<f64>]>,
        normaliser: f64,
    ) -> (NetworkParams, f64) {
        let trace = self.forward_trace(window, masks);
        let diff = &trace.output - &target;
        let sse = diff.iter().map(|v| v * v).sum::<f64>();
        let d_output = diff * (2.0 / normaliser);

        let mut grads = self.params.zeros_like();
        self.backward_trace(&trace, d_output, masks, &mut grads);
        (grads, sse)
    }

    fn check_window(&self, len: usize) -> Result<(), PredictorError> {
        if len != self.window_len {
            return Err(PredictorError::InvalidInput {
                reason: format!("expected a window of {} values, got {}", self.window_len, len),
            });
        }
        Ok(())
    }
}

impl SequenceModel for LstmNetwork {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn reset(&mut self) {
        let mut rng = self.config.rng();
        self.params = NetworkParams::init(&self.config, self.horizon, &mut rng);
    }

    fn fit(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<Vec<f64>, PredictorError> {
        self.check_window(inputs.ncols())?;
        if targets.ncols() != self.horizon || targets.nrows() != inputs.nrows() {
            return Err(PredictorError::InvalidInput {
                reason: format!(
                    "targets {:?} do not match inputs {:?} with horizon {}",
                    targets.dim(),
                    inputs.dim(),
                    self.horizon
                ),
            });
        }
        if inputs.nrows() == 0 {
            return Err(PredictorError::Training {
                reason: "no training windows".to_string(),
            });
        }
        if batch_size == 0 {
            return Err(PredictorError::invalid_config("batch size must be positive"));
        }

        let samples = inputs.nrows();
        let mut rng = self.config.rng();
        let mut adam = Adam::new(&self.params, self.config.learning_rate);
        let mut order: Vec<usize> = (0..samples).collect();
        let mut history = Vec::with_capacity(epochs);

        debug!(
            "Fitting {} ({} parameters) on {} windows",
            self.name(),
            self.parameter_count(),
            samples
        );

        for epoch in 1..=epochs {
            order.shuffle(&mut rng);
            let mut epoch_sse = 0.0;

            for batch in order.chunks(batch_size) {
                let masks: Vec<Option<DropoutMasks>> =
                    batch.iter().map(|_| self.dropout_masks(&mut rng)).collect();
                let normaliser = (batch.len() * self.horizon) as f64;

                let per_sample: Vec<(NetworkParams, f64)> = batch
                    .par_iter()
                    .zip(masks.par_iter())
                    .map(|(&idx, mask)| {
                        self.sample_gradients(
                            inputs.row(idx),
                            targets.row(idx),
                            mask.as_deref(),
                            normaliser,
                        )
                    })
                    .collect();

                // Summed in batch order so runs with a fixed seed are reproducible
                let mut grads = self.params.zeros_like();
                for (g, sse) in &per_sample {
                    grads.accumulate(g);
                    epoch_sse += sse;
                }
                if let Some(clip) = self.config.gradient_clip {
                    grads.clip_norm(clip);
                }
                adam.step(&mut self.params, &grads);
            }

            let loss = epoch_sse / (samples * self.horizon) as f64;
            if !loss.is_finite() {
                return Err(PredictorError::Training {
                    reason: format!("loss diverged at epoch {}", epoch),
                });
            }
            info!("Epoch {}/{} - loss: {:.6}", epoch, epochs, loss);
            history.push(loss);
        }

        Ok(history)
    }

    fn validate(&self) -> Result<(), PredictorError> {
        self.config.validate()?;
        self.check_shapes()
    }

    fn predict(&self, window: ArrayView1<'_, f64>) -> Result<Array1<f64>, PredictorError> {
        self.check_window(window.len())?;
        Ok(self.forward_trace(window, None).output)
    }

    fn name(&self) -> &str {
        "Stacked LSTM"
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn sum_sq<D: Dimension>(a: &Array<f64, D>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

/// target += col ⊗ row
fn accumulate_outer(target: &mut Array2<f64>, col: &Array1<f64>, row: &Array1<f64>) {
    let col = col.view().insert_axis(Axis(1));
    let row = row.view().insert_axis(Axis(0));
    general_mat_mul(1.0, &col, &row, 1.0, target);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> NetworkConfig {
        NetworkConfig::default()
            .with_lstm_units(vec![4, 5])
            .with_dense_units(vec![3])
            .with_dropout(0.0)
            .with_gradient_clip(None)
            .with_seed(42)
    }

    fn mse(net: &LstmNetwork, inputs: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let mut total = 0.0;
        for (x, y) in inputs.outer_iter().zip(targets.outer_iter()) {
            let out = net.predict(x).unwrap();
            total += (&out - &y).iter().map(|v| v * v).sum::<f64>();
        }
        total / (inputs.nrows() * targets.ncols()) as f64
    }

    #[test]
    fn test_output_shape_follows_horizon() {
        let net = LstmNetwork::new(small_config(), 6, 2).unwrap();
        let window = Array1::linspace(0.0, 1.0, 6);

        let out = net.predict(window.view()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_predict_rejects_wrong_window_length() {
        let net = LstmNetwork::new(small_config(), 6, 1).unwrap();
        let window = Array1::zeros(4);

        assert!(matches!(
            net.predict(window.view()),
            Err(PredictorError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_sized_network_is_rejected() {
        assert!(LstmNetwork::new(small_config(), 0, 1).is_err());
        assert!(LstmNetwork::new(small_config(), 5, 0).is_err());
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = LstmNetwork::new(small_config(), 5, 1).unwrap();
        let b = LstmNetwork::new(small_config(), 5, 1).unwrap();
        let window = Array1::from_vec(vec![0.1, 0.4, 0.2, 0.9, 0.5]);

        assert_eq!(
            a.predict(window.view()).unwrap(),
            b.predict(window.view()).unwrap()
        );
    }

    #[test]
    fn test_parameter_count() {
        let net = LstmNetwork::new(small_config(), 5, 1).unwrap();
        // lstm1: 4*4*1 + 4*4*4 + 16 = 96, lstm2: 20*4 + 20*5 + 20 = 200
        // dense: 3*5 + 3 = 18, out: 1*3 + 1 = 4
        assert_eq!(net.parameter_count(), 96 + 200 + 18 + 4);
    }

    #[test]
    fn test_analytic_gradient_matches_finite_difference() {
        let net = LstmNetwork::new(small_config(), 4, 1).unwrap();
        let window = Array1::from_vec(vec![0.2, 0.7, 0.1, 0.5]);
        let target = Array1::from_vec(vec![0.6]);

        let (grads, _) = net.sample_gradients(window.view(), target.view(), None, 1.0);

        let loss = |n: &LstmNetwork| {
            let out = n.predict(window.view()).unwrap();
            (&out - &target).iter().map(|v| v * v).sum::<f64>()
        };
        let eps = 1e-6;

        // A weight deep in the first LSTM layer
        let mut plus = net.clone();
        plus.params.lstm[0].u[[3, 2]] += eps;
        let mut minus = net.clone();
        minus.params.lstm[0].u[[3, 2]] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert!((numeric - grads.lstm[0].u[[3, 2]]).abs() < 1e-6);

        // A dense-head weight
        let mut plus = net.clone();
        plus.params.dense[0].w[[1, 4]] += eps;
        let mut minus = net.clone();
        minus.params.dense[0].w[[1, 4]] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert!((numeric - grads.dense[0].w[[1, 4]]).abs() < 1e-6);
    }

    #[test]
    fn test_fit_reduces_loss_on_simple_pattern() {
        let mut net =
            LstmNetwork::new(small_config().with_learning_rate(0.01), 5, 1).unwrap();
        let series: Vec<f64> = (0..40).map(|i| 0.5 + 0.4 * (i as f64 * 0.3).sin()).collect();
        let samples = series.len() - 5;
        let inputs = Array2::from_shape_fn((samples, 5), |(i, j)| series[i + j]);
        let targets = Array::from_shape_fn((samples, 1), |(i, _)| series[i + 5]);

        let before = mse(&net, &inputs, &targets);
        let history = net.fit(&inputs, &targets, 30, 8).unwrap();
        let after = mse(&net, &inputs, &targets);

        assert_eq!(history.len(), 30);
        assert!(after < before, "loss did not improve: {} -> {}", before, after);
    }

    #[test]
    fn test_fit_with_dropout_stays_finite() {
        let mut net =
            LstmNetwork::new(small_config().with_dropout(0.2), 4, 1).unwrap();
        let inputs = Array2::from_shape_fn((12, 4), |(i, j)| ((i + j) % 5) as f64 / 5.0);
        let targets = Array2::from_shape_fn((12, 1), |(i, _)| ((i + 4) % 5) as f64 / 5.0);

        let history = net.fit(&inputs, &targets, 3, 5).unwrap();
        assert!(history.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_fit_rejects_mismatched_targets() {
        let mut net = LstmNetwork::new(small_config(), 4, 1).unwrap();
        let inputs = Array2::zeros((3, 4));
        let targets = Array2::zeros((2, 1));

        assert!(net.fit(&inputs, &targets, 1, 2).is_err());
    }

    #[test]
    fn test_reset_restores_seeded_initialisation() {
        let fresh = LstmNetwork::new(small_config(), 4, 1).unwrap();
        let mut trained = fresh.clone();
        let inputs = Array2::from_elem((4, 4), 0.3);
        let targets = Array2::from_elem((4, 1), 0.9);
        trained.fit(&inputs, &targets, 2, 2).unwrap();

        trained.reset();
        let window = Array1::from_elem(4, 0.3);
        assert_eq!(
            trained.predict(window.view()).unwrap(),
            fresh.predict(window.view()).unwrap()
        );
    }
}
