use rocket::Request;

use crate::resp::problem::{problems, Problem};

#[catch(400)]
pub fn bad_request(_: &Request) -> Problem {
    problems::parse_problem()
}

#[catch(404)]
pub fn not_found(req: &Request) -> Problem {
    let mut problem = problems::not_found_problem();
    problem.detail(format!("No route for {} {}", req.method(), req.uri()));
    problem
}

#[catch(422)]
pub fn unprocessable(_: &Request) -> Problem {
    problems::unprocessable_problem()
}

#[catch(500)]
pub fn internal_error(req: &Request) -> Problem {
    tracing::error!("Unhandled failure on {} {}", req.method(), req.uri());
    problems::internal_problem()
}
