use super::error::{DataError, DataResult};
use super::model::{Dataset, ExperimentId, NumericColumn};

/// First-degree least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares over `points`.
pub fn fit_line(points: &[[f64; 2]]) -> DataResult<LineFit> {
    if points.len() < 2 {
        return Err(DataError::InsufficientData(format!(
            "need at least 2 points, got {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
        let dx = p[0] - mean_x;
        (sxy + dx * (p[1] - mean_y), sxx + dx * dx)
    });

    if sxx == 0.0 {
        return Err(DataError::InsufficientData(
            "all x values are identical".to_string(),
        ));
    }

    let slope = sxy / sxx;
    Ok(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Fit `y` on `x` for one participant of one experiment.
pub fn participant_line(
    dataset: &Dataset,
    experiment: i64,
    participant: i64,
    x: NumericColumn,
    y: NumericColumn,
) -> DataResult<LineFit> {
    let id = ExperimentId::new(experiment)?;
    let subject = u32::try_from(participant)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| {
            DataError::InvalidArgument(format!(
                "participant id must be positive, got {participant}"
            ))
        })?;
    let table = dataset
        .experiment(id)
        .ok_or_else(|| DataError::InsufficientData(format!("{id} is not loaded")))?;

    let rows: Vec<_> = table.participant(subject).collect();
    if rows.len() < 2 {
        return Err(DataError::InsufficientData(format!(
            "{id}, participant {subject}: {} rows",
            rows.len()
        )));
    }
    for column in [x, y] {
        if rows.iter().all(|r| r.value(column).is_none()) {
            return Err(DataError::InsufficientData(format!(
                "{id}, participant {subject}: no values in '{column}'"
            )));
        }
    }

    let points: Vec<[f64; 2]> = rows.iter().filter_map(|r| r.point(x, y)).collect();
    fit_line(&points).map_err(|e| match e {
        DataError::InsufficientData(reason) => {
            DataError::InsufficientData(format!("{id}, participant {subject}: {reason}"))
        }
        other => other,
    })
}
