/// Plane list parser
///
/// One plane per line: `plane <nx> <ny> <nz> <dist>`. Everything after `#`
/// is a comment and blank lines are skipped.
use nalgebra::Vector3;
use nom::{
    bytes::complete::tag,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, opt, rest, value},
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::PlaneFileError;
use crate::plane::Plane;

/// Parse a plane list, normalizing every normal.
pub fn parse_planes(input: &str) -> Result<Vec<Plane>, PlaneFileError> {
    let mut planes = Vec::new();

    for (index, text) in input.lines().enumerate() {
        let line = index + 1;
        let fields = match all_consuming(parse_line)(text) {
            Ok((_, fields)) => fields,
            Err(_) => {
                return Err(PlaneFileError::Syntax {
                    line,
                    text: text.trim().to_string(),
                })
            }
        };

        if let Some((normal, dist)) = fields {
            let plane = Plane::new(normal, dist)
                .map_err(|source| PlaneFileError::Geometry { line, source })?;
            planes.push(plane);
        }
    }

    Ok(planes)
}

fn parse_line(input: &str) -> IResult<&str, Option<(Vector3<f32>, f32)>> {
    let (input, _) = space0(input)?;
    let (input, plane) = opt(parse_plane)(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(parse_comment)(input)?;
    Ok((input, plane))
}

fn parse_comment(input: &str) -> IResult<&str, ()> {
    value((), preceded(char('#'), rest))(input)
}

fn parse_plane(input: &str) -> IResult<&str, (Vector3<f32>, f32)> {
    let (input, _) = tag("plane")(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = space1(input)?;
    let (input, dist) = float(input)?;
    Ok((input, (normal, dist)))
}

fn parse_vector3(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, _) = space1(input)?;
    let (input, x) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, z) = float(input)?;
    Ok((input, Vector3::new(x, y, z)))
}
