//! Interactive route decision prompt.

use std::io::{BufRead, Write};
use tracing::{info, warn};

use world_atlas::{NavError, RouteDecision, RoutePreference};

use super::{NavigationSuggestion, RouteCache};

/// Result of [`decide_route`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// A decision already existed and nothing needed deciding.
    AlreadyCached(RoutePreference),
    /// A stored edge makes the prompt unnecessary.
    NotNeeded(NavigationSuggestion),
    /// The operator chose, and the choice was cached.
    Decided(RouteDecision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Direct,
    UseRoute,
    Block,
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String, NavError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        warn!("route decision prompt reached end of input");
        return Err(NavError::DecisionCancelled);
    }
    Ok(line.trim().to_string())
}

/// Ask the operator how travel between `from` and `to` should be handled
/// and cache the answer.
///
/// End of input yields `DecisionCancelled`; anything that is not one of the
/// listed numbers yields `InvalidChoice`. Nothing is cached on failure.
pub fn decide_route<R: BufRead, W: Write>(
    cache: &mut RouteCache<'_>,
    from: &str,
    to: &str,
    input: &mut R,
    output: &mut W,
) -> Result<DecisionOutcome, NavError> {
    let suggestion = cache.suggest_navigation(from, to)?;

    let options = match suggestion {
        NavigationSuggestion::NeedsDecision { options, .. } => options,
        other => {
            if let Some(pref) = cache.get_cached_decision(from, to) {
                writeln!(output, "Decision already cached: {:?}", pref.decision)?;
                return Ok(DecisionOutcome::AlreadyCached(pref.clone()));
            }
            return Ok(DecisionOutcome::NotNeeded(other));
        }
    };

    let rule = "=".repeat(60);
    writeln!(output, "{}", rule)?;
    writeln!(output, "ROUTE DECISION: {} -> {}", from, to)?;
    writeln!(output, "{}", rule)?;
    writeln!(output)?;

    let mut choices = Vec::new();

    if let Some(direct) = &options.direct {
        choices.push(Choice::Direct);
        writeln!(output, "[{}] DIRECT PATH", choices.len())?;
        writeln!(output, "    Distance: {}m", direct.distance_meters)?;
        writeln!(output, "    Direction: {}", direct.compass)?;
        writeln!(output, "    Bearing: {}°", direct.bearing)?;
        writeln!(output)?;
    }

    if let Some(route) = &options.use_route {
        choices.push(Choice::UseRoute);
        writeln!(output, "[{}] USE EXISTING ROUTE", choices.len())?;
        writeln!(output, "    Path: {}", route.path.join(" -> "))?;
        writeln!(output, "    Distance: {}m", route.distance_meters)?;
        writeln!(output, "    Hops: {}", route.hops)?;
        writeln!(output)?;
    }

    if let Some(reason) = &options.blocked_reason {
        writeln!(output, "[!] DIRECT PATH BLOCKED: {}", reason)?;
        writeln!(output)?;
    }

    choices.push(Choice::Block);
    writeln!(output, "[{}] BLOCK THIS ROUTE (permanently)", choices.len())?;
    writeln!(output)?;
    write!(output, "Enter choice [1-{}]: ", choices.len())?;
    output.flush()?;

    let answer = read_answer(input)?;
    let choice = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| choices.get(i).copied())
        .ok_or_else(|| NavError::InvalidChoice(answer.clone()))?;

    let decision = match choice {
        Choice::Direct => RouteDecision::Direct,
        Choice::UseRoute => match options.use_route {
            Some(route) => RouteDecision::UseRoute { route: route.path },
            None => return Err(NavError::InvalidChoice(answer)),
        },
        Choice::Block => {
            write!(output, "Enter reason for blocking: ")?;
            output.flush()?;
            let reason = read_answer(input)?;
            RouteDecision::Blocked {
                reason: (!reason.is_empty()).then_some(reason),
            }
        }
    };

    cache.cache_decision(from, to, decision.clone());
    info!(from, to, ?decision, "operator decided route");
    writeln!(output, "Decision cached.")?;

    Ok(DecisionOutcome::Decided(decision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use world_atlas::{CampaignState, EdgeMeta, Location, LocationGraph};

    fn state() -> CampaignState {
        let mut graph = LocationGraph::new();
        for (name, x, y) in [("Camp", 0.0, 0.0), ("Ford", 0.0, 1000.0), ("Tower", 1000.0, 1000.0)] {
            graph
                .insert_location(name, Location::world().with_coordinates(x, y))
                .unwrap();
        }
        graph.add_connection("Camp", "Ford", EdgeMeta::new().with_distance(1000.0));
        graph.add_connection("Ford", "Tower", EdgeMeta::new().with_distance(1000.0));
        CampaignState::new(graph)
    }

    fn run(state: &mut CampaignState, answers: &str) -> (Result<DecisionOutcome, NavError>, String) {
        let mut cache = RouteCache::new(state, 3);
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = decide_route(&mut cache, "Camp", "Tower", &mut input, &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_choose_direct() {
        let mut state = state();
        let (result, transcript) = run(&mut state, "1\n");
        assert_eq!(result.unwrap(), DecisionOutcome::Decided(RouteDecision::Direct));
        assert!(transcript.contains("[1] DIRECT PATH"));
        assert!(transcript.contains("[2] USE EXISTING ROUTE"));
        assert_eq!(
            state.overview.path_preferences["Camp <-> Tower"].decision,
            RouteDecision::Direct
        );
    }

    #[test]
    fn test_choose_route() {
        let mut state = state();
        let (result, _) = run(&mut state, "2\n");
        let DecisionOutcome::Decided(RouteDecision::UseRoute { route }) = result.unwrap() else {
            panic!("expected a route decision");
        };
        assert_eq!(route, ["Camp", "Ford", "Tower"]);
    }

    #[test]
    fn test_block_with_reason() {
        let mut state = state();
        let (result, _) = run(&mut state, "3\nRockslide\n");
        assert_eq!(
            result.unwrap(),
            DecisionOutcome::Decided(RouteDecision::Blocked {
                reason: Some("Rockslide".into())
            })
        );
    }

    #[test]
    fn test_invalid_and_cancelled_input() {
        let mut state = state();
        let (result, _) = run(&mut state, "seven\n");
        assert!(matches!(result, Err(NavError::InvalidChoice(_))));

        let (result, _) = run(&mut state, "9\n");
        assert!(matches!(result, Err(NavError::InvalidChoice(_))));

        let (result, _) = run(&mut state, "");
        assert!(matches!(result, Err(NavError::DecisionCancelled)));

        let (result, _) = run(&mut state, "3\n");
        assert!(matches!(result, Err(NavError::DecisionCancelled)));

        assert!(state.overview.path_preferences.is_empty());
    }

    #[test]
    fn test_existing_decision_returned() {
        let mut state = state();
        run(&mut state, "1\n").0.unwrap();
        let (result, _) = run(&mut state, "");
        assert!(matches!(result.unwrap(), DecisionOutcome::AlreadyCached(_)));
    }
}
