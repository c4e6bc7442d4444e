//! Per-pixel Kalman state shared by both filter modes.
//!
//! Every field is a [`Plane`] with the stream's resolution. The aggregate
//! is owned by one filter instance and mutated only through `&mut self`,
//! one frame at a time.

use crate::imgproc::{ImageError, Plane};

/// Initial corrected uncertainty.
const INITIAL_UNCERTAINTY: f32 = 1.0;
/// Initial Kalman gain.
const INITIAL_GAIN: f32 = 0.5;

/// Per-pixel recursive estimator state.
#[derive(Debug, Clone)]
pub struct KalmanState {
    /// Corrected state estimate `x(k|k)`.
    x_correction: Plane,
    /// Corrected uncertainty `P(k|k)`.
    p_correction: Plane,
    /// Predicted state `x(k|k-1)`.
    x_predicted: Plane,
    /// Predicted uncertainty `P(k|k-1)`.
    p_predicted: Plane,
    /// Kalman gain `K(k)`.
    gain: Plane,
    /// Measurement noise `R(k)`.
    noise: Plane,
    /// Smoothed reference from the previous frame.
    blurred: Plane,
    /// Temporal change of the smoothed reference.
    delta: Plane,
}

impl KalmanState {
    /// Initializes the state from the first observed frame.
    ///
    /// The estimate starts at the frame itself, uncertainty at 1, gain at
    /// 0.5, measurement noise at `initial_noise`, and the smoothed
    /// reference at zero.
    pub fn new(initial: Plane, initial_noise: f32) -> Self {
        let (width, height) = initial.dimensions();
        Self {
            x_predicted: Plane::zeros(width, height),
            p_predicted: Plane::filled(width, height, INITIAL_UNCERTAINTY),
            p_correction: Plane::filled(width, height, INITIAL_UNCERTAINTY),
            gain: Plane::filled(width, height, INITIAL_GAIN),
            noise: Plane::filled(width, height, initial_noise),
            blurred: Plane::zeros(width, height),
            delta: Plane::zeros(width, height),
            x_correction: initial,
        }
    }

    /// Returns `(width, height)` of every field.
    pub fn dimensions(&self) -> (usize, usize) {
        self.x_correction.dimensions()
    }

    pub fn x_correction(&self) -> &Plane {
        &self.x_correction
    }

    pub fn p_correction(&self) -> &Plane {
        &self.p_correction
    }

    pub fn x_predicted(&self) -> &Plane {
        &self.x_predicted
    }

    pub fn p_predicted(&self) -> &Plane {
        &self.p_predicted
    }

    pub fn gain(&self) -> &Plane {
        &self.gain
    }

    pub fn measurement_noise(&self) -> &Plane {
        &self.noise
    }

    pub fn delta(&self) -> &Plane {
        &self.delta
    }

    /// `delta = blurred_prev - smoothed`, then `blurred_prev = smoothed`.
    pub fn update_delta(&mut self, smoothed: &Plane) -> Result<(), ImageError> {
        self.blurred.ensure_same_size(smoothed)?;
        for ((d, b), &s) in self
            .delta
            .data_mut()
            .iter_mut()
            .zip(self.blurred.data_mut().iter_mut())
            .zip(smoothed.data())
        {
            *d = *b - s;
            *b = s;
        }
        Ok(())
    }

    /// `R = 1 + R / (1 + K_prev)`, using the gain of the previous frame.
    pub fn update_measurement_noise(&mut self) {
        for (r, &k) in self.noise.data_mut().iter_mut().zip(self.gain.data()) {
            *r = 1.0 + *r / (1.0 + k);
        }
    }

    /// Identity motion model: `x(k|k-1) = x(k-1|k-1)`,
    /// `P(k|k-1) = P(k-1|k-1) + q·δ²`.
    pub fn predict(&mut self, process_noise: f32) {
        self.x_predicted
            .data_mut()
            .copy_from_slice(self.x_correction.data());
        for ((pp, &pc), &d) in self
            .p_predicted
            .data_mut()
            .iter_mut()
            .zip(self.p_correction.data())
            .zip(self.delta.data())
        {
            *pp = pc + process_noise * d * d;
        }
    }

    /// `K = P(k|k-1) / (P(k|k-1) + R)`.
    ///
    /// `R` never drops below 1 after the noise update, so the denominator
    /// stays positive and the gain finite.
    pub fn update_gain(&mut self) {
        for ((k, &pp), &r) in self
            .gain
            .data_mut()
            .iter_mut()
            .zip(self.p_predicted.data())
            .zip(self.noise.data())
        {
            *k = pp / (pp + r);
        }
    }

    /// Fuses the prediction, the raw observation and its edge-preserving
    /// smoothed version:
    ///
    /// `x = (1-K)·(x_pred + K·(z - x_pred)) + K·bf`, `P = P_pred·(1-K)`.
    pub fn correct(&mut self, observed: &Plane, smoothed: &Plane) -> Result<(), ImageError> {
        self.x_correction.ensure_same_size(observed)?;
        self.x_correction.ensure_same_size(smoothed)?;

        let fused = self
            .x_correction
            .data_mut()
            .iter_mut()
            .zip(self.x_predicted.data())
            .zip(self.gain.data())
            .zip(observed.data().iter().zip(smoothed.data()));
        for (((x, &xp), &k), (&z, &bf)) in fused {
            *x = (1.0 - k) * (xp + k * (z - xp)) + k * bf;
        }

        for ((pc, &pp), &k) in self
            .p_correction
            .data_mut()
            .iter_mut()
            .zip(self.p_predicted.data())
            .zip(self.gain.data())
        {
            *pc = pp * (1.0 - k);
        }
        Ok(())
    }

    /// `x = w·x + (1-w)·previous`.
    pub fn blend_with(&mut self, previous: &Plane, weight: f32) -> Result<(), ImageError> {
        self.x_correction.ensure_same_size(previous)?;
        for (x, &p) in self.x_correction.data_mut().iter_mut().zip(previous.data()) {
            *x = weight * *x + (1.0 - weight) * p;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let first = Plane::from_fn(3, 2, |x, y| (x + y) as f32);
        let state = KalmanState::new(first.clone(), 10.0);

        assert_eq!(state.x_correction(), &first);
        assert!(state.p_correction().data().iter().all(|&v| v == 1.0));
        assert!(state.gain().data().iter().all(|&v| v == 0.5));
        assert!(state.measurement_noise().data().iter().all(|&v| v == 10.0));
        assert!(state.delta().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_delta_against_zero_reference() {
        let mut state = KalmanState::new(Plane::zeros(2, 2), 10.0);
        state.update_delta(&Plane::filled(2, 2, 5.0)).unwrap();
        assert!(state.delta().data().iter().all(|&v| v == -5.0));

        state.update_delta(&Plane::filled(2, 2, 5.0)).unwrap();
        assert!(state.delta().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_noise_recurrence_uses_previous_gain() {
        let mut state = KalmanState::new(Plane::zeros(1, 1), 10.0);
        state.update_measurement_noise();
        // 1 + 10 / (1 + 0.5)
        assert!((state.measurement_noise().get(0, 0) - 7.666_667).abs() < 1e-4);
    }

    #[test]
    fn test_predict_and_gain() {
        let mut state = KalmanState::new(Plane::filled(1, 1, 3.0), 10.0);
        state.update_delta(&Plane::filled(1, 1, 2.0)).unwrap();
        state.update_measurement_noise();
        state.predict(0.1);

        assert_eq!(state.x_predicted().get(0, 0), 3.0);
        // 1 + 0.1 * (-2)^2
        assert!((state.p_predicted().get(0, 0) - 1.4).abs() < 1e-6);

        state.update_gain();
        let r = state.measurement_noise().get(0, 0);
        assert!((state.gain().get(0, 0) - 1.4 / (1.4 + r)).abs() < 1e-6);
    }

    #[test]
    fn test_correct_fusion_formula() {
        let mut state = KalmanState::new(Plane::filled(1, 1, 100.0), 10.0);
        state.update_measurement_noise();
        state.predict(0.0);
        state.update_gain();
        let k = state.gain().get(0, 0);

        let z = Plane::filled(1, 1, 110.0);
        let bf = Plane::filled(1, 1, 104.0);
        state.correct(&z, &bf).unwrap();

        let expected = (1.0 - k) * (100.0 + k * 10.0) + k * 104.0;
        assert!((state.x_correction().get(0, 0) - expected).abs() < 1e-4);
        assert!((state.p_correction().get(0, 0) - (1.0 - k)).abs() < 1e-6);
    }

    #[test]
    fn test_correct_rejects_mismatched_planes() {
        let mut state = KalmanState::new(Plane::zeros(2, 2), 10.0);
        let wrong = Plane::zeros(3, 2);
        assert!(state.correct(&wrong, &wrong).is_err());
        assert!(state.update_delta(&wrong).is_err());
    }

    #[test]
    fn test_blend() {
        let mut state = KalmanState::new(Plane::filled(1, 1, 10.0), 5.0);
        state.blend_with(&Plane::filled(1, 1, 20.0), 0.7).unwrap();
        assert!((state.x_correction().get(0, 0) - 13.0).abs() < 1e-5);
    }
}
