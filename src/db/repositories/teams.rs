use diesel::prelude::*;

use crate::db::models::team::{NewTeam, NewUserTeam, Team};

pub struct TeamsRepo;

impl TeamsRepo {
    /// Loads the whole forest as (team_id, parent_id) pairs. The permission
    /// resolver walks this in memory instead of issuing recursive SQL.
    pub fn load_all_nodes(
        conn: &mut PgConnection,
    ) -> Result<Vec<(i32, Option<i32>)>, diesel::result::Error> {
        use crate::schema::teams::dsl::*;
        teams.select((team_id, parent_id)).load(conn)
    }

    /// Raw role grants for one user. Role text is parsed by the resolver so
    /// that a malformed value aborts resolution instead of being skipped.
    pub fn load_user_grants(
        conn: &mut PgConnection,
        user_id_val: i32,
    ) -> Result<Vec<(i32, String)>, diesel::result::Error> {
        use crate::schema::user_teams::dsl::*;
        user_teams
            .filter(user_id.eq(user_id_val))
            .select((team_id, role))
            .load(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        team_id_val: i32,
    ) -> Result<Option<Team>, diesel::result::Error> {
        use crate::schema::teams::dsl::*;
        teams
            .filter(team_id.eq(team_id_val))
            .first::<Team>(conn)
            .optional()
    }

    pub fn find_by_code(
        conn: &mut PgConnection,
        code_val: &str,
    ) -> Result<Option<Team>, diesel::result::Error> {
        use crate::schema::teams::dsl::*;
        teams.filter(code.eq(code_val)).first::<Team>(conn).optional()
    }

    pub fn list_by_ids(
        conn: &mut PgConnection,
        ids: &[i32],
    ) -> Result<Vec<Team>, diesel::result::Error> {
        use crate::schema::teams::dsl::*;
        teams
            .filter(team_id.eq_any(ids))
            .order(name.asc())
            .load::<Team>(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_team: &NewTeam,
    ) -> Result<Team, diesel::result::Error> {
        diesel::insert_into(crate::schema::teams::table)
            .values(new_team)
            .get_result(conn)
    }

    /// Creates or replaces the explicit grant for (user, team).
    pub fn upsert_grant(
        conn: &mut PgConnection,
        grant: &NewUserTeam,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::user_teams;
        diesel::insert_into(user_teams::table)
            .values(grant)
            .on_conflict((user_teams::user_id, user_teams::team_id))
            .do_update()
            .set(user_teams::role.eq(&grant.role))
            .execute(conn)
    }
}
