//!
//! test of em training of hmms and mixtures
//!
#[macro_use]
extern crate approx;

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::ops::ControlFlow;
use trackhmm::data::ObservationSet;
use trackhmm::distribution::{Categorical, Normal, Poisson, ScalarPdf};
use trackhmm::em::{self, EmConfig, NoHook};
use trackhmm::error::HmmError;
use trackhmm::estimator::{estimators_for, CategoricalEstimator, Estimator};
use trackhmm::hmm::Hmm;
use trackhmm::mixture::Mixture;
use trackhmm::pool::ThreadPool;

const X: [f64; 10] = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];

fn categorical_hmm() -> Hmm {
    let edist: Vec<Box<dyn ScalarPdf>> = vec![
        Box::new(Categorical::new(&[0.1, 0.9]).unwrap()),
        Box::new(Categorical::new(&[0.7, 0.3]).unwrap()),
    ];
    Hmm::from_probs(&[0.6, 0.4], &[0.7, 0.3, 0.4, 0.6], None, edist).unwrap()
}

fn until_convergence() -> EmConfig {
    EmConfig {
        epsilon: 1e-8,
        max_steps: None,
    }
}

///
/// normal random number by Box-Muller
///
fn sample_normal<R: Rng>(rng: &mut R, mu: f64, sigma: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    mu + sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[test]
fn baum_welch_unconstrained() {
    let h = categorical_hmm();
    let ll_init = h.log_pdf(&X).to_log_value();
    assert_abs_diff_eq!(ll_init, -5.978203, epsilon = 1e-5);

    let data = ObservationSet::new(&[X.to_vec()]);
    let mut estimators = estimators_for(h.edist()).unwrap();
    let pool = ThreadPool::sequential();
    let mut lls = Vec::new();
    let mut hook = |_: &Hmm, _: usize, ll: f64, _: f64| -> ControlFlow<()> {
        lls.push(ll);
        ControlFlow::Continue(())
    };
    let r = em::run(&h, &data, &mut estimators, &until_convergence(), &pool, &mut hook).unwrap();
    assert!(r.converged);

    let ll = r.model.log_pdf(&X).to_log_value();
    assert!(ll >= ll_init);
    assert_abs_diff_eq!(ll, -4.4933, epsilon = 1e-3);
    assert_abs_diff_eq!(ll, r.log_likelihood, epsilon = 1e-6);
    for w in lls.windows(2) {
        assert!(w[1] >= w[0] - 1e-10);
    }
}

#[test]
fn baum_welch_with_start_and_final_states() {
    let mut h = categorical_hmm();
    h.set_start_states(&[0]).unwrap();
    h.set_final_states(&[0]).unwrap();
    let ll_init = h.log_pdf(&X).to_log_value();

    let data = ObservationSet::new(&[X.to_vec()]);
    let mut estimators = estimators_for(h.edist()).unwrap();
    let pool = ThreadPool::sequential();
    let r = em::run(&h, &data, &mut estimators, &until_convergence(), &pool, &mut NoHook).unwrap();

    let ll = r.model.log_pdf(&X).to_log_value();
    assert!(ll >= ll_init);
    assert_abs_diff_eq!(ll, -5.83485, epsilon = 1e-4);
    // constraints survive training
    assert!(r.model.core().pi()[1].is_zero());
    assert!(r.model.core().tf()[[1, 1]].is_zero());
    let (path, _) = r.model.viterbi(&X).unwrap();
    assert_eq!(path[0], 0);
    assert_eq!(path[9], 0);
}

#[test]
fn parallel_training_equals_sequential() {
    let h = categorical_hmm();
    let seqs: Vec<Vec<f64>> = (0..7)
        .map(|i| X.iter().cycle().skip(i).take(6 + i).copied().collect())
        .collect();
    let data = ObservationSet::new(&seqs);
    let config = EmConfig {
        epsilon: 0.0,
        max_steps: Some(20),
    };

    let mut e1 = estimators_for(h.edist()).unwrap();
    let r1 = em::run(&h, &data, &mut e1, &config, &ThreadPool::sequential(), &mut NoHook).unwrap();
    let mut e4 = estimators_for(h.edist()).unwrap();
    let pool = ThreadPool::new(4).unwrap();
    let r4 = em::run(&h, &data, &mut e4, &config, &pool, &mut NoHook).unwrap();

    assert_eq!(r1.n_steps, r4.n_steps);
    assert_abs_diff_eq!(r1.log_likelihood, r4.log_likelihood, epsilon = 1e-8);
    for (a, b) in r1.model.parameters().iter().zip(r4.model.parameters().iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-8);
    }
}

#[test]
fn hook_can_stop_training() {
    let h = categorical_hmm();
    let data = ObservationSet::new(&[X.to_vec()]);
    let mut estimators = estimators_for(h.edist()).unwrap();
    let mut hook = |_: &Hmm, step: usize, _: f64, _: f64| -> ControlFlow<()> {
        if step == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };
    let r = em::run(
        &h,
        &data,
        &mut estimators,
        &until_convergence(),
        &ThreadPool::sequential(),
        &mut hook,
    )
    .unwrap();
    assert_eq!(r.n_steps, 2);
    assert!(!r.converged);
}

#[test]
fn step_limit_and_estimator_count() {
    let h = categorical_hmm();
    let data = ObservationSet::new(&[X.to_vec()]);
    let pool = ThreadPool::sequential();

    let config = EmConfig {
        max_steps: Some(0),
        ..EmConfig::default()
    };
    let mut estimators = estimators_for(h.edist()).unwrap();
    let r = em::run(&h, &data, &mut estimators, &config, &pool, &mut NoHook).unwrap();
    assert_eq!(r.n_steps, 0);
    assert_eq!(r.model.parameters(), h.parameters());

    let mut too_few: Vec<Box<dyn Estimator>> = vec![Box::new(CategoricalEstimator::new(2))];
    let e = em::run(&h, &data, &mut too_few, &config, &pool, &mut NoHook);
    assert!(matches!(
        e,
        Err(HmmError::EstimatorCount {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn poisson_hmm_separates_levels() {
    let edist: Vec<Box<dyn ScalarPdf>> = vec![
        Box::new(Poisson::new(1.0).unwrap()),
        Box::new(Poisson::new(5.0).unwrap()),
    ];
    let h = Hmm::from_probs(&[0.5, 0.5], &[0.9, 0.1, 0.1, 0.9], None, edist).unwrap();
    let x: Vec<f64> = [0., 1., 0., 2., 1., 0., 1., 12., 9., 11., 10., 8., 12., 1., 0., 2., 1.].to_vec();
    let data = ObservationSet::new(&[x.clone()]);
    let mut estimators = estimators_for(h.edist()).unwrap();
    let r = em::run(
        &h,
        &data,
        &mut estimators,
        &EmConfig::default(),
        &ThreadPool::sequential(),
        &mut NoHook,
    )
    .unwrap();
    assert!(r.model.log_pdf(&x) >= h.log_pdf(&x));
    let lambdas: Vec<f64> = r.model.edist().iter().map(|d| d.parameters()[0]).collect();
    assert!(lambdas[0] < 2.0);
    assert!(lambdas[1] > 8.0);
    let (path, _) = r.model.viterbi(&x).unwrap();
    assert_eq!(&path[7..13], &[1, 1, 1, 1, 1, 1]);
    assert_eq!(path[0], 0);
}

#[test]
fn mixture_recovers_normal_components() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let xs: Vec<f64> = (0..3000)
        .map(|i| {
            if i % 10 < 3 {
                sample_normal(&mut rng, -2.0, 0.5)
            } else {
                sample_normal(&mut rng, 3.0, 1.0)
            }
        })
        .collect();
    let edist: Vec<Box<dyn ScalarPdf>> = vec![
        Box::new(Normal::new(-1.0, 1.0).unwrap()),
        Box::new(Normal::new(1.0, 1.0).unwrap()),
    ];
    let m = Mixture::new(&[0.5, 0.5], edist).unwrap();
    let data = ObservationSet::new(&[xs]);
    let mut estimators = estimators_for(m.edist()).unwrap();
    let pool = ThreadPool::new(2).unwrap();
    let r = em::run(&m, &data, &mut estimators, &EmConfig::default(), &pool, &mut NoHook).unwrap();
    assert!(r.converged);

    let w: Vec<f64> = r.model.log_weights().iter().map(|x| x.to_value()).collect();
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(w[0], 0.3, epsilon = 0.03);
    let p0 = r.model.edist()[0].parameters();
    let p1 = r.model.edist()[1].parameters();
    assert_abs_diff_eq!(p0[0], -2.0, epsilon = 0.1);
    assert_abs_diff_eq!(p0[1], 0.5, epsilon = 0.1);
    assert_abs_diff_eq!(p1[0], 3.0, epsilon = 0.1);
    assert_abs_diff_eq!(p1[1], 1.0, epsilon = 0.1);
    assert_eq!(r.model.classify(-2.0).unwrap(), 0);
    assert_eq!(r.model.classify(3.0).unwrap(), 1);
}
