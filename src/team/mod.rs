//! Teams let several users share transactions and split the totals by
//! percentage.

mod core;
mod endpoints;

pub use core::{
    MemberShare, Team, TeamMember, TeamSplit, add_team_member, create_team, create_team_tables,
    get_team_members, get_team_split, is_team_member,
};
pub use endpoints::{add_team_member_endpoint, create_team_endpoint, get_team_split_endpoint};
