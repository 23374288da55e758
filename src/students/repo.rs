use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use tokio::sync::RwLock;

use super::repo_types::{NewStudent, Student, StudentPatch, StudentRow};

#[async_trait]
pub trait StudentRepo: Send + Sync {
    async fn insert(&self, student: NewStudent) -> anyhow::Result<Student>;
    /// Every student, id ascending.
    async fn list_all(&self) -> anyhow::Result<Vec<Student>>;
    /// One window of students (id ascending) and the total count.
    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Student>, i64)>;
    /// Case-insensitive substring match on the name, id ascending.
    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<Student>>;
    async fn update(&self, id: i64, patch: StudentPatch) -> anyhow::Result<Option<Student>>;
    /// Removes the student with all its grades. `false` when the id is unknown.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

// ---- in-memory ----

#[derive(Default)]
struct StudentTable {
    rows: BTreeMap<i64, Student>,
    next_id: i64,
}

/// Process-local student store; the map keeps id order.
#[derive(Default)]
pub struct MemoryStudentRepo {
    table: RwLock<StudentTable>,
}

impl MemoryStudentRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepo for MemoryStudentRepo {
    async fn insert(&self, student: NewStudent) -> anyhow::Result<Student> {
        let mut table = self.table.write().await;
        table.next_id += 1;
        let created = Student {
            id: table.next_id,
            name: student.name,
            age: student.age,
            grades: student.grades,
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Student>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Student>, i64)> {
        let table = self.table.read().await;
        let items = table
            .rows
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, table.rows.len() as i64))
    }

    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<Student>> {
        let needle = query.to_lowercase();
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, patch: StudentPatch) -> anyhow::Result<Option<Student>> {
        let mut table = self.table.write().await;
        let Some(student) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(student);
        Ok(Some(student.clone()))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

// ---- postgres ----

pub struct PgStudentRepo {
    db: PgPool,
}

impl PgStudentRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn attach_grades<'e, E>(executor: E, rows: Vec<StudentRow>) -> anyhow::Result<Vec<Student>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let grade_rows = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT student_id, value
              FROM grades
             WHERE student_id = ANY($1)
             ORDER BY student_id, id
            "#,
        )
        .bind(&ids)
        .fetch_all(executor)
        .await
        .context("load grades")?;

        let mut by_student: HashMap<i64, Vec<f64>> = HashMap::new();
        for (student_id, value) in grade_rows {
            by_student.entry(student_id).or_default().push(value);
        }
        Ok(rows
            .into_iter()
            .map(|r| {
                let grades = by_student.remove(&r.id).unwrap_or_default();
                r.with_grades(grades)
            })
            .collect())
    }
}

/// Insert grade rows for a student within a transaction, preserving order.
async fn insert_grades_tx(
    tx: &mut Transaction<'_, Postgres>,
    student_id: i64,
    grades: &[f64],
) -> anyhow::Result<()> {
    for value in grades {
        sqlx::query("INSERT INTO grades (student_id, value) VALUES ($1, $2)")
            .bind(student_id)
            .bind(value)
            .execute(&mut **tx)
            .await
            .context("insert grade")?;
    }
    Ok(())
}

#[async_trait]
impl StudentRepo for PgStudentRepo {
    async fn insert(&self, student: NewStudent) -> anyhow::Result<Student> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            INSERT INTO students (name, age)
            VALUES ($1, $2)
            RETURNING id, name, age
            "#,
        )
        .bind(&student.name)
        .bind(student.age)
        .fetch_one(&mut *tx)
        .await
        .context("insert student")?;
        insert_grades_tx(&mut tx, row.id, &student.grades).await?;
        tx.commit().await.context("commit tx")?;
        Ok(row.with_grades(student.grades))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Student>> {
        let rows = sqlx::query_as::<_, StudentRow>(
            r#"SELECT id, name, age FROM students ORDER BY id ASC"#,
        )
        .fetch_all(&self.db)
        .await
        .context("list students")?;
        Self::attach_grades(&self.db, rows).await
    }

    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Student>, i64)> {
        let rows = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, name, age
              FROM students
             ORDER BY id ASC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list students page")?;
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&self.db)
            .await
            .context("count students")?;
        Ok((Self::attach_grades(&self.db, rows).await?, total))
    }

    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<Student>> {
        let rows = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, name, age
              FROM students
             WHERE strpos(lower(name), lower($1)) > 0
             ORDER BY id ASC
            "#,
        )
        .bind(query)
        .fetch_all(&self.db)
        .await
        .context("search students")?;
        Self::attach_grades(&self.db, rows).await
    }

    async fn update(&self, id: i64, patch: StudentPatch) -> anyhow::Result<Option<Student>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            UPDATE students
               SET name = COALESCE($2, name),
                   age = COALESCE($3, age)
             WHERE id = $1
            RETURNING id, name, age
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.age)
        .fetch_optional(&mut *tx)
        .await
        .context("update student")?;
        let Some(row) = row else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        if let Some(grades) = &patch.grades {
            sqlx::query("DELETE FROM grades WHERE student_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("clear grades")?;
            insert_grades_tx(&mut tx, id, grades).await?;
        }

        let student = Self::attach_grades(&mut *tx, vec![row]).await?.pop();
        tx.commit().await.context("commit tx")?;
        Ok(student)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM grades WHERE student_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete grades")?;
        let removed = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete student")?
            .rows_affected();
        tx.commit().await.context("commit tx")?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(name: &str, grades: &[f64]) -> NewStudent {
        NewStudent {
            name: name.into(),
            age: 20.0,
            grades: grades.to_vec(),
        }
    }

    async fn seeded() -> MemoryStudentRepo {
        let repo = MemoryStudentRepo::new();
        for (name, grades) in [
            ("Ana", &[8.0, 7.5, 9.0][..]),
            ("Bruno", &[5.0, 6.0, 5.5][..]),
            ("Carla", &[4.0, 3.5, 4.8][..]),
            ("Mariana", &[9.0][..]),
        ] {
            repo.insert(new_student(name, grades)).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn list_page_windows_in_id_order() {
        let repo = seeded().await;
        let (items, total) = repo.list_page(2, 1).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(
            items.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
        let (items, _) = repo.list_page(50, 10).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let repo = seeded().await;
        let found = repo.search_by_name("AN").await.unwrap();
        assert_eq!(
            found.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Ana", "Mariana"]
        );
        assert_eq!(repo.search_by_name("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn update_replaces_grades_wholesale() {
        let repo = seeded().await;
        let updated = repo
            .update(
                1,
                StudentPatch {
                    grades: Some(vec![10.0]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.grades, vec![10.0]);
        assert_eq!(updated.name, "Ana");
        assert!(repo.update(99, StudentPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_unknown_leaves_store_unchanged() {
        let repo = seeded().await;
        assert!(!repo.delete(99).await.unwrap());
        assert_eq!(repo.list_all().await.unwrap().len(), 4);
        assert!(repo.delete(2).await.unwrap());
        let ids: Vec<i64> = repo.list_all().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = seeded().await;
        repo.delete(4).await.unwrap();
        let s = repo.insert(new_student("Davi", &[7.0])).await.unwrap();
        assert_eq!(s.id, 5);
    }

    mod pg {
        use super::*;

        async fn seeded_pg(pool: PgPool) -> PgStudentRepo {
            let repo = PgStudentRepo::new(pool);
            repo.insert(new_student("Ana", &[8.0, 7.5, 9.0])).await.unwrap();
            repo.insert(new_student("Bruno", &[5.0, 6.0, 5.5])).await.unwrap();
            repo
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "needs a Postgres DATABASE_URL"]
        async fn update_replaces_grades_in_order(pool: PgPool) {
            let repo = seeded_pg(pool).await;
            let updated = repo
                .update(
                    1,
                    StudentPatch {
                        name: Some("Ana Maria".into()),
                        grades: Some(vec![10.0, 6.5]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(updated.name, "Ana Maria");
            assert_eq!(updated.age, 20.0);
            assert_eq!(updated.grades, vec![10.0, 6.5]);

            let all = repo.list_all().await.unwrap();
            assert_eq!(all[0].grades, vec![10.0, 6.5]);
            assert_eq!(all[1].grades, vec![5.0, 6.0, 5.5]);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "needs a Postgres DATABASE_URL"]
        async fn unknown_id_changes_nothing(pool: PgPool) {
            let repo = seeded_pg(pool).await;
            let patch = StudentPatch {
                grades: Some(vec![1.0]),
                ..Default::default()
            };
            assert!(repo.update(99, patch).await.unwrap().is_none());
            let all = repo.list_all().await.unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].grades, vec![8.0, 7.5, 9.0]);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "needs a Postgres DATABASE_URL"]
        async fn failed_grade_insert_rolls_back_the_whole_update(pool: PgPool) {
            let repo = seeded_pg(pool).await;
            let patch = StudentPatch {
                name: Some("Renamed".into()),
                grades: Some(vec![9.0, 12.0]),
                ..Default::default()
            };
            assert!(repo.update(1, patch).await.is_err());

            let ana = repo.list_all().await.unwrap().remove(0);
            assert_eq!(ana.name, "Ana");
            assert_eq!(ana.grades, vec![8.0, 7.5, 9.0]);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "needs a Postgres DATABASE_URL"]
        async fn delete_takes_grades_along(pool: PgPool) {
            let repo = seeded_pg(pool.clone()).await;
            assert!(repo.delete(1).await.unwrap());
            assert!(!repo.delete(1).await.unwrap());
            let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM grades")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(left, 3);
        }
    }
}
