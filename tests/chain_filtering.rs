extern crate stern_gerlach;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stern_gerlach::*;

const ATOMS: usize = 100_000;

fn assert_near(a: f64, b: f64, tolerance: f64) {
    assert!((a - b).abs() < tolerance, "{} is not within {} of {}", a, tolerance, b);
}

#[test]
fn test_filter_gates_next_stage() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(
        ATOMS,
        vec![
            Analyzer::new(Axis::Z, Filter::Up),
            Analyzer::unfiltered(Axis::X),
        ],
    )
    .with_seed(10)
    .run()?;
    assert_eq!(tallies[0].total(), ATOMS as u64);
    assert_eq!(tallies[1].total(), tallies[0].up);
    assert_near(tallies[1].up_fraction().unwrap(), 0.5, 0.01);
    Ok(())
}

#[test]
fn test_down_filter_gates_next_stage() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(
        ATOMS,
        vec![
            Analyzer::new(Axis::Y, Filter::Down),
            Analyzer::unfiltered(Axis::Y),
        ],
    )
    .with_seed(11)
    .run()?;
    assert_eq!(tallies[1].total(), tallies[0].down);
    assert_eq!(tallies[1].up, 0);
    Ok(())
}

#[test]
fn test_rejecting_stage_counts_its_outcome() -> SimulationResult<()> {
    let z = Eigenbasis::<f64>::fixed(FixedAxis::Z, SpinKind::Half);
    let tallies = Ensemble::new(
        500,
        vec![
            Analyzer::new(Axis::Z, Filter::Up),
            Analyzer::unfiltered(Axis::X),
        ],
    )
    .with_initial_state(InitialState::Fixed(z.down().clone()))
    .with_seed(12)
    .run()?;
    // Every particle is counted as down at the first stage, then blocked.
    assert_eq!(
        tallies[0],
        Tally {
            up: 0,
            zero: 0,
            down: 500
        }
    );
    assert_eq!(tallies[1].total(), 0);
    assert_eq!(tallies[1].up_fraction(), None);
    Ok(())
}

#[test]
fn test_last_stage_filter_still_counts() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(1000, vec![Analyzer::new(Axis::X, Filter::Up)])
        .with_seed(13)
        .run()?;
    assert_eq!(tallies.len(), 1);
    assert_eq!(tallies[0].total(), 1000);
    assert!(tallies[0].down > 0);
    Ok(())
}

#[test]
fn test_sequential_z_x_z() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(
        ATOMS,
        vec![
            Analyzer::new(Axis::Z, Filter::Up),
            Analyzer::new(Axis::X, Filter::Up),
            Analyzer::unfiltered(Axis::Z),
        ],
    )
    .with_seed(14)
    .run()?;
    assert_eq!(tallies[2].total(), tallies[1].up);
    // The x measurement erases the z information.
    assert_near(tallies[2].up_fraction().unwrap(), 0.5, 0.02);
    Ok(())
}

#[test]
fn test_forget_decouples_stages() -> SimulationResult<()> {
    let z = Eigenbasis::<f64>::fixed(FixedAxis::Z, SpinKind::Half);
    let analyzers = vec![Analyzer::unfiltered(Axis::Z), Analyzer::unfiltered(Axis::Z)];

    let remembered = Ensemble::new(ATOMS, analyzers.clone())
        .with_initial_state(InitialState::Fixed(z.up().clone()))
        .with_seed(15)
        .run()?;
    assert_eq!(remembered[1].up, ATOMS as u64);

    let forgotten = Ensemble::new(ATOMS, analyzers)
        .with_initial_state(InitialState::Fixed(z.up().clone()))
        .with_forget(true)
        .with_seed(15)
        .run()?;
    assert_eq!(forgotten[0].up, ATOMS as u64);
    assert_near(forgotten[1].up_fraction().unwrap(), 0.5, 0.01);
    Ok(())
}

#[test]
fn test_forget_decouples_filtered_stages() -> SimulationResult<()> {
    let analyzers = vec![
        Analyzer::new(Axis::Z, Filter::Up),
        Analyzer::unfiltered(Axis::Z),
    ];

    let remembered = Ensemble::<f64>::new(ATOMS, analyzers.clone())
        .with_seed(19)
        .run()?;
    assert_eq!(remembered[1].total(), remembered[0].up);
    assert_eq!(remembered[1].up, remembered[0].up);

    let forgotten = Ensemble::<f64>::new(ATOMS, analyzers)
        .with_forget(true)
        .with_seed(19)
        .run()?;
    // About half of the particles pass the filter, so measure over that population.
    assert_eq!(forgotten[1].total(), forgotten[0].up);
    assert_near(forgotten[1].up_fraction().unwrap(), 0.5, 0.015);
    Ok(())
}

#[test]
fn test_single_particle_chain_records() -> SimulationResult<()> {
    let mut rng = StdRng::seed_from_u64(16);
    let x = Eigenbasis::<f64>::fixed(FixedAxis::X, SpinKind::Half);
    let analyzers = [
        Analyzer::new(Axis::X, Filter::Up),
        Analyzer::new(Axis::X, Filter::Up),
        Analyzer::unfiltered(Axis::X),
    ];
    let records = run_chain(x.up(), &analyzers, false, &mut rng)?;
    let outcomes: Vec<_> = records.iter().map(|r| (r.stage, r.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![(0, Outcome::Up), (1, Outcome::Up), (2, Outcome::Up)]
    );
    Ok(())
}

#[test]
fn test_spin_one_zero_filter() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(
        ATOMS,
        vec![
            Analyzer::new(Axis::Z, Filter::Zero),
            Analyzer::unfiltered(Axis::X),
        ],
    )
    .with_spin(SpinKind::One)
    .with_seed(17)
    .run()?;
    assert_eq!(tallies[0].total(), ATOMS as u64);
    assert_near(tallies[0].fraction(Outcome::Zero).unwrap(), 1.0 / 3.0, 0.01);
    assert_eq!(tallies[1].total(), tallies[0].zero);
    // |<x,0|z,0>|^2 = 0, the zero state splits between x up and x down.
    assert_eq!(tallies[1].zero, 0);
    assert_near(tallies[1].up_fraction().unwrap(), 0.5, 0.02);
    Ok(())
}

#[test]
fn test_spin_half_never_measures_zero() -> SimulationResult<()> {
    let tallies = Ensemble::<f64>::new(5000, vec![Analyzer::unfiltered(Axis::parametric(50.0, 20.0))])
        .with_seed(18)
        .run()?;
    assert_eq!(tallies[0].zero, 0);
    Ok(())
}
