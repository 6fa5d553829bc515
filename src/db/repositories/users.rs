use diesel::prelude::*;

use crate::db::models::user::User;

pub struct UsersRepo;

impl UsersRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(id.eq(user_id))
            .filter(active.eq(true))
            .first::<User>(conn)
            .optional()
    }
}
